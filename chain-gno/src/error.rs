use relayer_primitives::Error;

/// Gno shares CometBFT's RPC transport with the Tendermint driver, so RPC
/// failures are classified the same way (spec 4.1: "the same capability
/// set").
pub fn from_rpc_error(context: &str, err: tendermint_rpc::Error) -> Error {
    Error::Network(format!("{context}: {err}"))
}
