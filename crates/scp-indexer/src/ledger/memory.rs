use super::{
    CollectionInfo, ContractRef, Ledger, LedgerError, NewCollection, NewToken, TokenInfo,
    TokenKind,
};
use crate::error::short_address;
use bitcoin::Txid;
use scp_rpc::Transaction;
use serde::Serialize;

/// Blocks per year at one-minute block spacing, the period SCP-2 inflation is expressed over.
const BLOCKS_PER_YEAR: u128 = 525_600;

/// Denominator of the per-block reward numerator: percent per year.
const REWARD_DENOMINATOR: u128 = 100 * BLOCKS_PER_YEAR;

#[derive(Debug, Clone)]
struct Account {
    address: String,
    balance: u64,
    /// Accrued rewards scaled by [`REWARD_DENOMINATOR`].
    reward_numerator: u128,
    /// Height of the last balance change.
    last_movement: u32,
}

impl Account {
    fn unclaimed(&self) -> u64 {
        u64::try_from(self.reward_numerator / REWARD_DENOMINATOR).unwrap_or(u64::MAX)
    }
}

/// Ledger entry recorded for every applied token mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub txid: Txid,
    pub height: u32,
    pub address: String,
    /// Signed balance change.
    pub delta: i128,
    pub kind: &'static str,
}

#[derive(Debug, Clone)]
struct Token {
    index: u64,
    id: Txid,
    kind: TokenKind,
    name: String,
    ticker: String,
    creator: String,
    max_supply: u64,
    supply: u64,
    accounts: Vec<Account>,
    activity: Vec<Activity>,
}

impl Token {
    fn info(&self) -> TokenInfo {
        TokenInfo {
            id: self.id,
            index: self.index,
            kind: self.kind,
            name: self.name.clone(),
            ticker: self.ticker.clone(),
            creator: self.creator.clone(),
            max_supply: self.max_supply,
            supply: self.supply,
            owners: self.accounts.len(),
        }
    }

    fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.address == address)
    }

    fn account_mut(&mut self, address: &str, height: u32) -> &mut Account {
        let position = match self.accounts.iter().position(|a| a.address == address) {
            Some(position) => position,
            None => {
                self.accounts.push(Account {
                    address: address.to_string(),
                    balance: 0,
                    reward_numerator: 0,
                    last_movement: height,
                });
                self.accounts.len() - 1
            }
        };
        &mut self.accounts[position]
    }

    fn remaining_supply(&self) -> u64 {
        self.max_supply.saturating_sub(self.supply)
    }

    /// Accrues `blocks` worth of staking rewards as of `height`.
    fn accrue(&mut self, height: u32, blocks: u32) {
        let TokenKind::Scp2 { inflation, min_age } = self.kind else {
            return;
        };

        for account in self.accounts.iter_mut() {
            let age = u64::from(height.saturating_sub(account.last_movement));
            if account.balance == 0 || age < min_age {
                continue;
            }
            account.reward_numerator +=
                u128::from(account.balance) * u128::from(inflation) * u128::from(blocks);
        }
    }

    fn record(
        &mut self,
        tx: &Transaction,
        height: u32,
        address: &str,
        delta: i128,
        kind: &'static str,
    ) {
        self.activity.push(Activity {
            txid: tx.txid,
            height,
            address: address.to_string(),
            delta,
            kind,
        });
    }
}

/// A single SCP-4 NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nft {
    /// Id of the minting transaction.
    pub id: Txid,
    pub owner: String,
    pub name: String,
    pub reference: String,
    pub minted_at: u32,
}

#[derive(Debug, Clone)]
struct Collection {
    index: u64,
    id: Txid,
    name: String,
    creator: String,
    protected: bool,
    max_mints: Option<u64>,
    created_at: u32,
    minted: u64,
    nfts: Vec<Nft>,
}

impl Collection {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            id: self.id,
            index: self.index,
            name: self.name.clone(),
            creator: self.creator.clone(),
            protected: self.protected,
            max_mints: self.max_mints,
            created_at: self.created_at,
            minted: self.minted,
        }
    }

    fn nft_position(&self, nft_id: &str) -> Result<usize, LedgerError> {
        self.nfts
            .iter()
            .position(|nft| nft.id.to_string() == nft_id)
            .ok_or_else(|| LedgerError::UnknownNft(nft_id.to_string()))
    }
}

/// In-memory [`Ledger`].
///
/// Tokens and collections share one index space, so an indexed call names exactly one
/// contract. Indexers numbering tokens and collections separately assign different
/// indexes to the same contracts, so a replayed `id<n>` reference may resolve to another
/// contract than it did there.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    height: u32,
    next_index: u64,
    tokens: Vec<Token>,
    collections: Vec<Collection>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest height reported by the scanner.
    pub fn block_height(&self) -> u32 {
        self.height
    }

    pub fn tokens(&self) -> Vec<TokenInfo> {
        self.tokens.iter().map(Token::info).collect()
    }

    pub fn collections(&self) -> Vec<CollectionInfo> {
        self.collections.iter().map(Collection::info).collect()
    }

    /// Balance of `address`, zero for an address that never held the token.
    pub fn balance(&self, token: &ContractRef, address: &str) -> u64 {
        self.find_token(token)
            .and_then(|token| token.account(address))
            .map_or(0, |account| account.balance)
    }

    /// Staking rewards `address` could redeem right now.
    pub fn unclaimed_rewards(&self, token: &ContractRef, address: &str) -> u64 {
        self.find_token(token)
            .and_then(|token| token.account(address))
            .map_or(0, Account::unclaimed)
    }

    pub fn activity(&self, token: &ContractRef) -> &[Activity] {
        self.find_token(token)
            .map_or(&[], |token| token.activity.as_slice())
    }

    pub fn nfts(&self, collection: &ContractRef) -> &[Nft] {
        self.find_collection(collection)
            .map_or(&[], |collection| collection.nfts.as_slice())
    }

    fn find_token(&self, target: &ContractRef) -> Option<&Token> {
        self.tokens.iter().find(|token| match target {
            ContractRef::Txid(txid) => token.id == *txid,
            ContractRef::Index(index) => token.index == *index,
        })
    }

    fn find_collection(&self, target: &ContractRef) -> Option<&Collection> {
        self.collections.iter().find(|collection| match target {
            ContractRef::Txid(txid) => collection.id == *txid,
            ContractRef::Index(index) => collection.index == *index,
        })
    }

    fn token_mut(&mut self, id: &Txid) -> Result<&mut Token, LedgerError> {
        self.tokens
            .iter_mut()
            .find(|token| token.id == *id)
            .ok_or(LedgerError::UnknownContract(*id))
    }

    fn collection_mut(&mut self, id: &Txid) -> Result<&mut Collection, LedgerError> {
        self.collections
            .iter_mut()
            .find(|collection| collection.id == *id)
            .ok_or(LedgerError::UnknownContract(*id))
    }

    fn ensure_new_contract(&self, id: &Txid) -> Result<(), LedgerError> {
        let exists = self.tokens.iter().any(|token| token.id == *id)
            || self.collections.iter().any(|collection| collection.id == *id);
        if exists {
            return Err(LedgerError::DuplicateContract(*id));
        }
        Ok(())
    }

    fn allocate_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }
}

fn debit(account: &mut Account, amount: u64, height: u32) -> Result<(), LedgerError> {
    if account.balance < amount {
        return Err(LedgerError::InsufficientBalance {
            address: short_address(&account.address),
            balance: account.balance,
            requested: amount,
        });
    }
    account.balance -= amount;
    account.last_movement = height;
    Ok(())
}

impl Ledger for MemoryLedger {
    fn set_block_height(&mut self, height: u32) {
        if height <= self.height {
            return;
        }

        // Nothing can be staked before the first contract exists.
        if self.height > 0 {
            let blocks = height - self.height;
            for token in self.tokens.iter_mut() {
                token.accrue(height, blocks);
            }
        }

        self.height = height;
    }

    fn add_token(&mut self, token: NewToken) -> Result<(), LedgerError> {
        self.ensure_new_contract(&token.id)?;
        let index = self.allocate_index();
        self.tokens.push(Token {
            index,
            id: token.id,
            kind: token.kind,
            name: token.name,
            ticker: token.ticker,
            creator: token.creator,
            max_supply: token.max_supply,
            supply: 0,
            accounts: Vec::new(),
            activity: Vec::new(),
        });
        Ok(())
    }

    fn add_collection(
        &mut self,
        collection: NewCollection,
        height: u32,
    ) -> Result<(), LedgerError> {
        self.ensure_new_contract(&collection.id)?;
        let index = self.allocate_index();
        self.collections.push(Collection {
            index,
            id: collection.id,
            name: collection.name,
            creator: collection.creator,
            protected: collection.protected,
            max_mints: collection.max_mints,
            created_at: height,
            minted: 0,
            nfts: Vec::new(),
        });
        Ok(())
    }

    fn token(&self, target: &ContractRef) -> Option<TokenInfo> {
        self.find_token(target).map(Token::info)
    }

    fn collection(&self, target: &ContractRef) -> Option<CollectionInfo> {
        self.find_collection(target).map(Collection::info)
    }

    fn credit_account(
        &mut self,
        token: &Txid,
        address: &str,
        amount: u64,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let height = self.height;
        let token = self.token_mut(token)?;

        let available = token.remaining_supply();
        if amount > available {
            return Err(LedgerError::ExceedsMaxSupply {
                requested: amount,
                available,
            });
        }

        let account = token.account_mut(address, height);
        account.balance += amount;
        account.last_movement = height;
        token.supply += amount;
        token.record(tx, height, address, i128::from(amount), "mint");
        Ok(())
    }

    fn debit_account(
        &mut self,
        token: &Txid,
        address: &str,
        amount: u64,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let height = self.height;
        let token = self.token_mut(token)?;

        let Some(account) = token.accounts.iter_mut().find(|a| a.address == address) else {
            return Err(LedgerError::InsufficientBalance {
                address: short_address(address),
                balance: 0,
                requested: amount,
            });
        };

        debit(account, amount, height)?;
        token.supply -= amount;
        token.record(tx, height, address, -i128::from(amount), "burn");
        Ok(())
    }

    fn transfer(
        &mut self,
        token: &Txid,
        from: &str,
        to: &str,
        amount: u64,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let height = self.height;
        let token = self.token_mut(token)?;

        let Some(sender) = token.accounts.iter_mut().find(|a| a.address == from) else {
            return Err(LedgerError::InsufficientBalance {
                address: short_address(from),
                balance: 0,
                requested: amount,
            });
        };
        debit(sender, amount, height)?;

        let receiver = token.account_mut(to, height);
        receiver.balance += amount;
        receiver.last_movement = height;

        token.record(tx, height, from, -i128::from(amount), "send");
        token.record(tx, height, to, i128::from(amount), "receive");
        Ok(())
    }

    fn redeem_rewards(
        &mut self,
        token: &Txid,
        address: &str,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let height = self.height;
        let token = self.token_mut(token)?;

        if !matches!(token.kind, TokenKind::Scp2 { .. }) {
            return Err(LedgerError::NotStakable);
        }

        let available = token.remaining_supply();
        let Some(account) = token.accounts.iter_mut().find(|a| a.address == address) else {
            return Err(LedgerError::NothingToRedeem(short_address(address)));
        };

        let reward = account.unclaimed().min(available);
        if reward == 0 {
            return Err(LedgerError::NothingToRedeem(short_address(address)));
        }

        account.reward_numerator -= u128::from(reward) * REWARD_DENOMINATOR;
        account.balance += reward;
        account.last_movement = height;
        token.supply += reward;
        token.record(tx, height, address, i128::from(reward), "redeem");
        Ok(())
    }

    fn mint_nft(
        &mut self,
        collection: &Txid,
        owner: &str,
        name: &str,
        reference: &str,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let height = self.height;
        let collection = self.collection_mut(collection)?;

        if let Some(max_mints) = collection.max_mints {
            if collection.minted >= max_mints {
                return Err(LedgerError::MaxMintsReached(max_mints));
            }
        }

        collection.nfts.push(Nft {
            id: tx.txid,
            owner: owner.to_string(),
            name: name.to_string(),
            reference: reference.to_string(),
            minted_at: height,
        });
        collection.minted += 1;
        Ok(())
    }

    fn transfer_nft(
        &mut self,
        collection: &Txid,
        from: &str,
        to: &str,
        nft_id: &str,
        _tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let collection = self.collection_mut(collection)?;
        let position = collection.nft_position(nft_id)?;
        let nft = &mut collection.nfts[position];

        if nft.owner != from {
            return Err(LedgerError::NotNftOwner {
                nft: nft_id.to_string(),
                address: short_address(from),
            });
        }

        nft.owner = to.to_string();
        Ok(())
    }

    fn destroy_nft(
        &mut self,
        collection: &Txid,
        owner: &str,
        nft_id: &str,
        _tx: &Transaction,
    ) -> Result<(), LedgerError> {
        let collection = self.collection_mut(collection)?;

        if collection.protected {
            return Err(LedgerError::ProtectedCollection);
        }

        let position = collection.nft_position(nft_id)?;
        if collection.nfts[position].owner != owner {
            return Err(LedgerError::NotNftOwner {
                nft: nft_id.to_string(),
                address: short_address(owner),
            });
        }

        collection.nfts.remove(position);
        Ok(())
    }
}
