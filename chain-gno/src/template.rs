//! Realm-source generation (spec Design Notes 9: "Handlebars Go-source
//! templates (Gno path) -> string validation at the boundary"). The
//! template is a fixed constant, not a runtime code-generation framework --
//! this module only fills in a value-object parameter bundle, and every
//! identifier in that bundle is validated against `[A-Za-z0-9._-/]` before
//! it ever touches the template engine.

use handlebars::Handlebars;
use relayer_primitives::{error::Error, ident::validate_all};
use serde::Serialize;

/// The light-client realm Gno.land deploys to track a counterparty chain.
/// Mirrors the fields a `07-tendermint`-style client needs, rendered as Gno
/// source rather than submitted as a protobuf `MsgCreateClient`.
const CREATE_CLIENT_REALM_TEMPLATE: &str = r#"package {{realm_namespace}}

import (
	"std"
)

var clientID = "{{client_id}}"
var counterpartyChainID = "{{counterparty_chain_id}}"
var trustingPeriodSeconds int64 = {{trusting_period_secs}}
var latestHeight int64 = {{latest_height}}

func init() {
	registerClient(clientID, counterpartyChainID, trustingPeriodSeconds, latestHeight)
}
"#;

/// The realm patch `registerCounterparty` (v2) emits: binds a client-id on
/// this chain to its counterparty client-id, the same content a
/// `MsgRegisterCounterparty` carries on a Cosmos SDK chain.
const REGISTER_COUNTERPARTY_REALM_TEMPLATE: &str = r#"package {{realm_namespace}}

var counterpartyClientID = "{{counterparty_client_id}}"

func init() {
	bindCounterparty("{{client_id}}", counterpartyClientID)
}
"#;

/// The realm patch `updateClient` emits: advances the tracked header for
/// `client_id` (spec 4.3 Update, step 5: "Submit `MsgUpdateClient`"). Gno has
/// no validator-set-driven header; the patch just records the new height and
/// app hash the realm should trust from here on.
const UPDATE_CLIENT_REALM_TEMPLATE: &str = r#"package {{realm_namespace}}

func init() {
	updateClient("{{client_id}}", {{new_height}}, "{{new_app_hash_hex}}")
}
"#;

/// The realm patch `recvPackets` emits: one `recvPacket` call per batch
/// entry, each carrying the sending client, sequence, opaque payload bytes,
/// and the Merkle proof of the commitment at `proof_height` (spec 4.1
/// `recvPackets(batch, proofs, height)`).
const RECV_PACKETS_REALM_TEMPLATE: &str = r#"package {{realm_namespace}}

func init() {
{{#each packets}}
	recvPacket("{{this.source_client}}", "{{this.destination_client}}", {{this.sequence}}, {{../proof_height}}, "{{this.payload_hex}}", "{{this.proof_hex}}")
{{/each}}
}
"#;

/// The realm patch `ackPackets` emits: one `ackPacket` call per batch entry,
/// carrying the acknowledgement bytes and the proof that the ack was
/// written on the counterparty (spec 4.1 `ackPackets(batch, proofs, height)`).
const ACK_PACKETS_REALM_TEMPLATE: &str = r#"package {{realm_namespace}}

func init() {
{{#each acks}}
	ackPacket("{{this.source_client}}", "{{this.destination_client}}", {{this.sequence}}, {{../proof_height}}, "{{this.ack_hex}}", "{{this.proof_hex}}")
{{/each}}
}
"#;

/// The realm patch `timeoutPackets` emits: one `timeoutPacket` call per
/// batch entry, carrying the receipt-absence proof and the next sequence a
/// v2 client addresses (spec 4.1 `timeoutPackets(batch, proofs, nextSeqs,
/// height)` -- v2 packets carry their own sequence, so `next_sequence_recv`
/// here is always the packet's own sequence; see `link::v2::resolve_next_seqs`).
const TIMEOUT_PACKETS_REALM_TEMPLATE: &str = r#"package {{realm_namespace}}

func init() {
{{#each packets}}
	timeoutPacket("{{this.source_client}}", "{{this.destination_client}}", {{this.sequence}}, {{this.next_sequence_recv}}, {{../proof_height}}, "{{this.proof_hex}}")
{{/each}}
}
"#;

#[derive(Debug, Clone, Serialize)]
pub struct RecvPacketEntry {
    pub source_client: String,
    pub destination_client: String,
    pub sequence: u64,
    pub payload_hex: String,
    pub proof_hex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecvPacketsRealmParams {
    pub realm_namespace: String,
    pub proof_height: u64,
    pub packets: Vec<RecvPacketEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckPacketEntry {
    pub source_client: String,
    pub destination_client: String,
    pub sequence: u64,
    pub ack_hex: String,
    pub proof_hex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckPacketsRealmParams {
    pub realm_namespace: String,
    pub proof_height: u64,
    pub acks: Vec<AckPacketEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeoutPacketEntry {
    pub source_client: String,
    pub destination_client: String,
    pub sequence: u64,
    pub next_sequence_recv: u64,
    pub proof_hex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeoutPacketsRealmParams {
    pub realm_namespace: String,
    pub proof_height: u64,
    pub packets: Vec<TimeoutPacketEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateClientRealmParams {
    pub realm_namespace: String,
    pub client_id: String,
    pub counterparty_chain_id: String,
    pub trusting_period_secs: u64,
    pub latest_height: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterCounterpartyRealmParams {
    pub realm_namespace: String,
    pub client_id: String,
    pub counterparty_client_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateClientRealmParams {
    pub realm_namespace: String,
    pub client_id: String,
    pub new_height: u64,
    pub new_app_hash_hex: String,
}

pub fn render_create_client_realm(params: &CreateClientRealmParams) -> Result<String, Error> {
    validate_all([
        params.realm_namespace.as_str(),
        params.client_id.as_str(),
        params.counterparty_chain_id.as_str(),
    ])?;
    render(CREATE_CLIENT_REALM_TEMPLATE, params)
}

pub fn render_register_counterparty_realm(
    params: &RegisterCounterpartyRealmParams,
) -> Result<String, Error> {
    validate_all([
        params.realm_namespace.as_str(),
        params.client_id.as_str(),
        params.counterparty_client_id.as_str(),
    ])?;
    render(REGISTER_COUNTERPARTY_REALM_TEMPLATE, params)
}

pub fn render_update_client_realm(params: &UpdateClientRealmParams) -> Result<String, Error> {
    validate_all([params.realm_namespace.as_str(), params.client_id.as_str(), params.new_app_hash_hex.as_str()])?;
    render(UPDATE_CLIENT_REALM_TEMPLATE, params)
}

pub fn render_recv_packets_realm(params: &RecvPacketsRealmParams) -> Result<String, Error> {
    validate_all(std::iter::once(params.realm_namespace.as_str()).chain(
        params.packets.iter().flat_map(|p| [p.source_client.as_str(), p.destination_client.as_str()]),
    ))?;
    render(RECV_PACKETS_REALM_TEMPLATE, params)
}

pub fn render_ack_packets_realm(params: &AckPacketsRealmParams) -> Result<String, Error> {
    validate_all(std::iter::once(params.realm_namespace.as_str()).chain(
        params.acks.iter().flat_map(|a| [a.source_client.as_str(), a.destination_client.as_str()]),
    ))?;
    render(ACK_PACKETS_REALM_TEMPLATE, params)
}

pub fn render_timeout_packets_realm(params: &TimeoutPacketsRealmParams) -> Result<String, Error> {
    validate_all(std::iter::once(params.realm_namespace.as_str()).chain(
        params.packets.iter().flat_map(|p| [p.source_client.as_str(), p.destination_client.as_str()]),
    ))?;
    render(TIMEOUT_PACKETS_REALM_TEMPLATE, params)
}

fn render(template: &str, params: &impl Serialize) -> Result<String, Error> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry
        .render_template(template, params)
        .map_err(|e| Error::Protocol(format!("realm template render failed: {e}")))
}
