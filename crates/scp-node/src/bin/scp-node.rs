fn main() -> scp_node::Result<()> {
    scp_node::run()
}
