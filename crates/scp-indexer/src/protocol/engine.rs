use super::number::{safe_integer_above, utf16_len};
use super::{Call, Creation, Message};
use crate::authorization::is_authorized;
use crate::constants::{DEPLOY_FEE, DEPLOY_FEE_DESTINATION, TXID_HEX_LEN};
use crate::error::{Error, ProcessError, ValidationError, short_address};
use crate::ledger::{
    CollectionInfo, LedgerError, NewCollection, NewToken, SharedLedger, TokenInfo,
};
use crate::tx_cache::RawTxCache;
use crate::upgrades::UpgradeOracle;
use crate::vm::BytecodeVm;
use bitcoin::Txid;
use scp_rpc::{ChainApi, Transaction, Vout};
use std::sync::Arc;

/// Effect of a successfully processed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Executed by the bytecode VM.
    Executed,
    /// A new contract was handed to the ledger.
    Created { version: u8, contract: Txid },
    /// A contract method mutated the ledger.
    Applied {
        contract: Txid,
        operation: &'static str,
    },
    /// Valid, but defined to have no effect.
    NoOp(&'static str),
    /// Not an SCP message, or a call of an unknown contract or method.
    Ignored,
}

type ProcessResult = Result<Outcome, ProcessError>;

fn ledger_error<'a>(
    operation: &'static str,
    contract: &'a str,
) -> impl FnOnce(LedgerError) -> ProcessError + 'a {
    move |source| ProcessError::Ledger {
        operation,
        contract: contract.to_string(),
        source,
    }
}

/// The caller of a contract method is whoever receives output 1.
fn caller_address(tx: &Transaction) -> Result<&str, ValidationError> {
    tx.output_address(1).ok_or(ValidationError::MissingCaller)
}

fn verify_deploy_fee(tx: &Transaction) -> Result<(), ValidationError> {
    let fee = tx.vout.get(1).ok_or(ValidationError::InvalidFeeOutput)?;
    let destination = fee.address().ok_or(ValidationError::InvalidFeeOutput)?;

    if fee.value < DEPLOY_FEE {
        return Err(ValidationError::InvalidFeeOutput);
    }

    if destination != DEPLOY_FEE_DESTINATION {
        return Err(ValidationError::InvalidFeeDestination {
            destination: short_address(destination),
        });
    }

    Ok(())
}

fn parse_amount(
    operation: &'static str,
    contract: &str,
    raw: Option<&str>,
) -> Result<u64, ValidationError> {
    raw.and_then(|raw| safe_integer_above(raw, 0))
        .ok_or_else(|| ValidationError::InvalidAmount {
            operation,
            contract: contract.to_string(),
            amount: raw.unwrap_or_default().to_string(),
        })
}

fn nft_id<'a>(
    raw: Option<&'a str>,
    operation: &'static str,
    contract: &str,
) -> Result<&'a str, ValidationError> {
    raw.filter(|id| utf16_len(id) == TXID_HEX_LEN)
        .ok_or_else(|| ValidationError::InvalidNftParams {
            operation,
            contract: contract.to_string(),
        })
}

/// Applies SCP messages to the ledger.
pub struct ProtocolEngine {
    chain: Arc<dyn ChainApi>,
    cache: Arc<RawTxCache>,
    ledger: SharedLedger,
    vm: Arc<dyn BytecodeVm>,
    upgrades: Arc<dyn UpgradeOracle>,
}

impl ProtocolEngine {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        cache: Arc<RawTxCache>,
        ledger: SharedLedger,
        vm: Arc<dyn BytecodeVm>,
        upgrades: Arc<dyn UpgradeOracle>,
    ) -> Self {
        Self {
            chain,
            cache,
            ledger,
            vm,
            upgrades,
        }
    }

    /// Validates `message` carried by `tx` at `height` and applies it to the ledger.
    ///
    /// Every ledger mutation happens after all the checks and RPC lookups it depends on, so
    /// an `Err` never leaves a half-applied message behind. Only
    /// [`ProcessError::Chain`] should abort a scan.
    pub async fn apply(&self, message: &str, tx: &Transaction, height: u32) -> ProcessResult {
        if self.vm.run(tx, message).await {
            return Ok(Outcome::Executed);
        }

        let indexed_addressing = self.upgrades.is_token_indexing_active(height);

        match Message::decode(message, indexed_addressing)? {
            Message::Create(creation) => self.create(creation, tx, height),
            Message::Call(call) => self.call(&call, tx).await,
            Message::Other => Ok(Outcome::Ignored),
        }
    }

    fn create(&self, creation: Creation<'_>, tx: &Transaction, height: u32) -> ProcessResult {
        let creator = tx
            .vout
            .last()
            .and_then(Vout::address)
            .ok_or(ValidationError::MissingCreator)?;

        verify_deploy_fee(tx)?;

        let version = creation.version();
        let contract = tx.txid.to_string();

        match creation {
            Creation::Token {
                kind,
                name,
                ticker,
                max_supply,
            } => {
                let token = NewToken {
                    id: tx.txid,
                    kind,
                    name: name.to_string(),
                    ticker: ticker.to_string(),
                    max_supply,
                    creator: creator.to_string(),
                };
                self.ledger
                    .write()
                    .add_token(token)
                    .map_err(ledger_error("create", &contract))?;
                tracing::info!(
                    version,
                    id = %tx.txid,
                    contract_name = name,
                    ticker,
                    max_supply,
                    creator = %short_address(creator),
                    "New SCP-{version} contract created"
                );
            }
            Creation::Collection {
                name,
                max_mints,
                protected,
            } => {
                if !self.upgrades.is_scp4_active(height) {
                    return Ok(Outcome::NoOp("SCP-4 is not active yet"));
                }
                let collection = NewCollection {
                    id: tx.txid,
                    name: name.to_string(),
                    max_mints,
                    protected,
                    creator: creator.to_string(),
                };
                self.ledger
                    .write()
                    .add_collection(collection, height)
                    .map_err(ledger_error("create", &contract))?;
                tracing::info!(
                    version,
                    id = %tx.txid,
                    contract_name = name,
                    ?max_mints,
                    protected,
                    creator = %short_address(creator),
                    "New SCP-{version} contract created"
                );
            }
        }

        Ok(Outcome::Created {
            version,
            contract: tx.txid,
        })
    }

    async fn call(&self, call: &Call<'_>, tx: &Transaction) -> ProcessResult {
        // A target resolving to a token is never also treated as a collection.
        let token = self.ledger.read().token(&call.target);
        if let Some(token) = token {
            return self.call_token(&token, call, tx).await;
        }

        let collection = self.ledger.read().collection(&call.target);
        if let Some(collection) = collection {
            return self.call_collection(&collection, call, tx).await;
        }

        tracing::debug!(
            contract = %call.target,
            method = call.method,
            "Call of unknown contract"
        );
        Ok(Outcome::Ignored)
    }

    async fn call_token(
        &self,
        token: &TokenInfo,
        call: &Call<'_>,
        tx: &Transaction,
    ) -> ProcessResult {
        let name = token.name.as_str();

        let operation = match call.method {
            "mint" => {
                // The issuer is always the first owner, so SCP-2 supply is fixed after one mint.
                if token.version() == 2 && token.owners > 0 {
                    return Ok(Outcome::NoOp("SCP-2 tokens can only be minted once"));
                }

                let amount = parse_amount("mint", name, call.arg(0))?;
                let caller = caller_address(tx)?;
                if caller != token.creator {
                    return Err(ValidationError::NonIssuer {
                        operation: "mint",
                        contract: name.to_string(),
                        issuer: short_address(&token.creator),
                        caller: short_address(caller),
                    }
                    .into());
                }
                self.authorize(tx, caller, "mint", name).await?;

                self.ledger
                    .write()
                    .credit_account(&token.id, &token.creator, amount, tx)
                    .map_err(ledger_error("mint", name))?;
                "mint"
            }
            "burn" => {
                let amount = parse_amount("burn", name, call.arg(0))?;
                let caller = caller_address(tx)?;
                self.authorize(tx, caller, "burn", name).await?;

                self.ledger
                    .write()
                    .debit_account(&token.id, caller, amount, tx)
                    .map_err(ledger_error("burn", name))?;
                "burn"
            }
            "send" => {
                let caller = caller_address(tx)?;
                let amount = parse_amount("send", name, call.arg(0))?;
                let receiver = call.arg(1).unwrap_or_default();
                if receiver.is_empty() || !self.is_valid_address(receiver).await? {
                    return Err(ValidationError::InvalidReceiver {
                        operation: "send",
                        contract: name.to_string(),
                        receiver: short_address(receiver),
                    }
                    .into());
                }
                self.authorize(tx, caller, "send", name).await?;

                self.ledger
                    .write()
                    .transfer(&token.id, caller, receiver, amount, tx)
                    .map_err(ledger_error("send", name))?;
                "send"
            }
            "redeem" if token.version() == 2 => {
                let caller = caller_address(tx)?;
                self.authorize(tx, caller, "redeem", name).await?;

                self.ledger
                    .write()
                    .redeem_rewards(&token.id, caller, tx)
                    .map_err(ledger_error("redeem", name))?;
                "redeem"
            }
            _ => return Ok(Outcome::Ignored),
        };

        Ok(Outcome::Applied {
            contract: token.id,
            operation,
        })
    }

    async fn call_collection(
        &self,
        collection: &CollectionInfo,
        call: &Call<'_>,
        tx: &Transaction,
    ) -> ProcessResult {
        let name = collection.name.as_str();
        let invalid_params = |operation| ValidationError::InvalidNftParams {
            operation,
            contract: name.to_string(),
        };

        let operation = match call.method {
            "mint" => {
                let (Some(nft_name), Some(reference)) = (call.arg(0), call.arg(1)) else {
                    return Err(invalid_params("mint").into());
                };
                if nft_name.is_empty() || reference.is_empty() {
                    return Err(invalid_params("mint").into());
                }

                let caller = caller_address(tx)?;
                if caller != collection.creator {
                    return Err(ValidationError::NonIssuer {
                        operation: "mint",
                        contract: name.to_string(),
                        issuer: short_address(&collection.creator),
                        caller: short_address(caller),
                    }
                    .into());
                }
                self.authorize(tx, caller, "mint", name).await?;

                self.ledger
                    .write()
                    .mint_nft(&collection.id, &collection.creator, nft_name, reference, tx)
                    .map_err(ledger_error("mint", name))?;
                "mint"
            }
            "transfer" => {
                let caller = caller_address(tx)?;
                let receiver = call.arg(0).unwrap_or_default();
                if receiver.is_empty() || !self.is_valid_address(receiver).await? {
                    return Err(invalid_params("transfer").into());
                }
                let nft = nft_id(call.arg(1), "transfer", name)?;
                self.authorize(tx, caller, "transfer", name).await?;

                self.ledger
                    .write()
                    .transfer_nft(&collection.id, caller, receiver, nft, tx)
                    .map_err(ledger_error("transfer", name))?;
                "transfer"
            }
            "destroy" => {
                let nft = nft_id(call.arg(0), "destroy", name)?;
                let caller = caller_address(tx)?;
                self.authorize(tx, caller, "destroy", name).await?;

                self.ledger
                    .write()
                    .destroy_nft(&collection.id, caller, nft, tx)
                    .map_err(ledger_error("destroy", name))?;
                "destroy"
            }
            _ => return Ok(Outcome::Ignored),
        };

        Ok(Outcome::Applied {
            contract: collection.id,
            operation,
        })
    }

    async fn authorize(
        &self,
        tx: &Transaction,
        caller: &str,
        operation: &'static str,
        contract: &str,
    ) -> Result<(), ProcessError> {
        if is_authorized(&self.cache, tx, caller).await? {
            Ok(())
        } else {
            Err(ProcessError::Unauthorized {
                operation,
                contract: contract.to_string(),
                caller: short_address(caller),
            })
        }
    }

    /// A node-side rejection means the address is invalid; transport failures propagate.
    async fn is_valid_address(&self, address: &str) -> Result<bool, ProcessError> {
        match self.chain.validate_address(address).await {
            Ok(valid) => Ok(valid),
            Err(err) if err.is_rejection() => Ok(false),
            Err(err) => Err(Error::from(err).into()),
        }
    }
}
