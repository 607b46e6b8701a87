//! Azure resource logs.
//!
//! Each generated line is one `{"records":[...]}` envelope, the shape Azure
//! diagnostic settings deliver to event hubs and storage.

use log::warn;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random::{self, pick};

static CATEGORIES: &[&str] = &[
    "Administrative",
    "Security",
    "ServiceHealth",
    "ResourceHealth",
    "StorageRead",
    "StorageWrite",
    "StorageDelete",
];
static LOCATIONS: &[&str] = &["eastus", "westus2", "westeurope", "northeurope", "southeastasia"];
static LEVELS: &[&str] = &["Informational", "Warning", "Error", "Critical"];
static RESULT_TYPES: &[&str] = &["Success", "Success", "Success", "Failure", "Start"];
static ERROR_CODES: &[(&str, &str)] = &[
    ("Forbidden", "The client does not have authorization to perform the action."),
    ("NotFound", "The requested resource was not found."),
    ("Conflict", "The request conflicts with the current state of the resource."),
    ("ServerBusy", "The server is currently unable to receive requests."),
];
static RESOURCE_TYPES: &[(&str, &str)] = &[
    ("Microsoft.Storage", "storageAccounts"),
    ("Microsoft.Compute", "virtualMachines"),
    ("Microsoft.Network", "networkSecurityGroups"),
    ("Microsoft.KeyVault", "vaults"),
];
static ADMIN_OPERATIONS: &[&str] = &[
    "Microsoft.Storage/storageAccounts/write",
    "Microsoft.Compute/virtualMachines/write",
    "Microsoft.Compute/virtualMachines/delete",
    "Microsoft.Resources/deployments/write",
];
static SECURITY_OPERATIONS: &[&str] = &[
    "Microsoft.Network/networkSecurityGroups/securityRules/write",
    "Microsoft.KeyVault/vaults/secrets/write",
    "Microsoft.KeyVault/vaults/secrets/read",
    "Microsoft.Security/locations/alerts/activate/action",
];
static ACTIONS: &[&str] = &[
    "Microsoft.Storage/storageAccounts/write",
    "Microsoft.Compute/virtualMachines/write",
    "Microsoft.Network/networkSecurityGroups/write",
    "Microsoft.KeyVault/vaults/secrets/write",
];
static ROLES: &[&str] = &["Owner", "Contributor", "Reader", "Storage Blob Data Contributor"];
static SECURITY_EVENT_TYPES: &[&str] = &["NetworkAccess", "KeyAccess", "PolicyViolation"];
static PROTOCOLS: &[&str] = &["TCP", "UDP", "ICMP"];
static DIRECTIONS: &[&str] = &["Inbound", "Outbound"];
static INCIDENT_TYPES: &[&str] = &["Incident", "Maintenance", "Information", "ActionRequired"];
static HEALTH_STATUSES: &[&str] = &["Available", "Degraded", "Unavailable", "Unknown"];
static HEALTH_CAUSES: &[&str] = &["PlatformInitiated", "UserInitiated", "Unknown"];
static HTTP_STATUS_CODES: &[u16] = &[200, 201, 202, 204, 304, 400, 403, 404, 409, 500, 503];

/// Write operations carry an identity block
static WRITE_OPERATIONS: &[&str] = &[
    "Microsoft.Storage/storageAccounts/write",
    "Microsoft.Compute/virtualMachines/write",
    "Microsoft.Network/networkSecurityGroups/securityRules/write",
    "Microsoft.KeyVault/vaults/secrets/write",
];

/// Upper bound on `records_per_event`
pub const MAX_RECORDS_PER_EVENT: usize = 1000;

/// Scratch line capacity reserved per record in an envelope
const LINE_BYTES_PER_RECORD: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    /// Entries per `records` envelope, clamped to 1..=[`MAX_RECORDS_PER_EVENT`]
    pub records_per_event: usize,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            records_per_event: 1,
        }
    }
}

#[derive(Serialize)]
struct Authorization {
    scope: String,
    action: &'static str,
    role: &'static str,
}

#[derive(Serialize)]
struct Claims {
    aud: &'static str,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

#[derive(Serialize)]
struct Identity {
    authorization: Authorization,
    claims: Claims,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceLog {
    time: String,
    resource_id: String,
    operation_name: &'static str,
    category: &'static str,
    result_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_signature: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_description: Option<&'static str>,
    duration_ms: u32,
    caller_ip_address: String,
    correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<Identity>,
    #[serde(rename = "Level")]
    level: &'static str,
    location: &'static str,
    properties: Value,
}

#[derive(Serialize)]
struct Envelope<'a> {
    records: &'a [ResourceLog],
}

fn resource_id(rng: &mut SmallRng) -> String {
    let (provider, kind) = RESOURCE_TYPES[rng.random_range(0..RESOURCE_TYPES.len())];
    format!(
        "/SUBSCRIPTIONS/{}/RESOURCEGROUPS/RG-{}/PROVIDERS/{provider}/{kind}/{}",
        random::uuid(rng).to_uppercase(),
        random::upper_alnum_string(rng, 6),
        random::alnum_string(rng, 8).to_lowercase(),
    )
}

fn operation_name(rng: &mut SmallRng, category: &str) -> &'static str {
    match category {
        "Administrative" => pick(rng, ADMIN_OPERATIONS),
        "Security" => pick(rng, SECURITY_OPERATIONS),
        "ServiceHealth" => "Microsoft.ResourceHealth/events/action",
        "ResourceHealth" => "Microsoft.Resourcehealth/healthevent/Activated/action",
        "StorageRead" => "GetBlob",
        "StorageWrite" => "PutBlob",
        _ => "DeleteBlob",
    }
}

fn properties(rng: &mut SmallRng, category: &str) -> Value {
    match category {
        "Administrative" => json!({
            "eventCategory": "Administrative",
            "eventDataId": random::uuid(rng),
            "operationId": random::uuid(rng),
            "httpRequest": {
                "clientRequestId": random::uuid(rng),
                "clientIpAddress": random::ip(rng),
                "method": pick(rng, random::HTTP_METHODS),
            },
        }),
        "Security" => json!({
            "securityEventType": pick(rng, SECURITY_EVENT_TYPES),
            "protocol": pick(rng, PROTOCOLS),
            "direction": pick(rng, DIRECTIONS),
        }),
        "ServiceHealth" => json!({
            "eventType": "ServiceIssue",
            "trackingId": random::uuid(rng),
            "incidentType": pick(rng, INCIDENT_TYPES),
        }),
        "ResourceHealth" => json!({
            "currentHealthStatus": pick(rng, HEALTH_STATUSES),
            "previousHealthStatus": pick(rng, HEALTH_STATUSES),
            "cause": pick(rng, HEALTH_CAUSES),
        }),
        _ => json!({
            "requestUrl": format!(
                "https://{}.blob.core.windows.net/{}/{}.log",
                random::alnum_string(rng, 10).to_lowercase(),
                pick(rng, &["logs", "backups", "uploads", "data"]),
                random::hex_string(rng, 12),
            ),
            "userAgentHeader": pick(rng, random::USER_AGENTS),
            "statusCode": HTTP_STATUS_CODES[rng.random_range(0..HTTP_STATUS_CODES.len())],
            "serverLatencyMs": rng.random_range(1..500),
        }),
    }
}

fn identity(rng: &mut SmallRng) -> Identity {
    let issued = random::unix_seconds(0);
    Identity {
        authorization: Authorization {
            scope: resource_id(rng),
            action: pick(rng, ACTIONS),
            role: pick(rng, ROLES),
        },
        claims: Claims {
            aud: "https://management.azure.com/",
            iss: format!("https://sts.windows.net/{}/", random::uuid(rng)),
            iat: issued,
            nbf: issued,
            exp: issued + 3600,
        },
    }
}

fn resource_log(rng: &mut SmallRng) -> ResourceLog {
    let category = pick(rng, CATEGORIES);
    let operation_name = operation_name(rng, category);
    let result_type = pick(rng, RESULT_TYPES);
    let (result_signature, result_description) = if result_type == "Success" {
        (None, None)
    } else {
        let (code, description) = ERROR_CODES[rng.random_range(0..ERROR_CODES.len())];
        (Some(code), Some(description))
    };
    let identity = WRITE_OPERATIONS
        .contains(&operation_name)
        .then(|| identity(rng));

    ResourceLog {
        time: random::iso8601_now(),
        resource_id: resource_id(rng),
        operation_name,
        category,
        result_type,
        result_signature,
        result_description,
        duration_ms: rng.random_range(1..5000),
        caller_ip_address: random::ip(rng),
        correlation_id: random::uuid(rng),
        identity,
        level: pick(rng, LEVELS),
        location: pick(rng, LOCATIONS),
        properties: properties(rng, category),
    }
}

pub struct AzureResourceLogProducer {
    acc: Accumulator,
    rng: SmallRng,
    records_per_event: usize,
    records: Vec<ResourceLog>,
    line: Vec<u8>,
}

impl AzureResourceLogProducer {
    pub fn new(settings: &AzureSettings, rng: SmallRng) -> Self {
        let requested = settings.records_per_event;
        let records_per_event = requested.clamp(1, MAX_RECORDS_PER_EVENT);
        if records_per_event != requested {
            warn!("azure records_per_event = {requested}, using {records_per_event}");
        }
        Self {
            acc: Accumulator::new(),
            rng,
            records_per_event,
            records: Vec::with_capacity(records_per_event),
            line: Vec::with_capacity(LINE_BYTES_PER_RECORD * records_per_event),
        }
    }
}

impl Producer for AzureResourceLogProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        self.records.clear();
        for _ in 0..self.records_per_event {
            self.records.push(resource_log(&mut self.rng));
        }

        self.line.clear();
        serde_json::to_writer(
            &mut self.line,
            &Envelope {
                records: &self.records,
            },
        )?;
        self.line.push(b'\n');
        self.acc.write(&self.line);
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.acc.drain_and_reset()
    }
}
