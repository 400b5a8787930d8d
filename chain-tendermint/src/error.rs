use relayer_primitives::Error;

/// Tendermint RPC errors are always transport/gateway failures from the
/// relayer's point of view (connection refused, timeout, malformed
/// response) -- map them onto `Error::Network` so the retry policy in
/// spec 5 applies uniformly.
pub fn from_rpc_error(context: &str, err: tendermint_rpc::Error) -> Error {
    Error::Network(format!("{context}: {err}"))
}

pub fn protocol(context: impl Into<String>) -> Error {
    Error::Protocol(context.into())
}
