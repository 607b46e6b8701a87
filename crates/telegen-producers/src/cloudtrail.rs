//! CloudTrail S3 data events.
//!
//! Unlike the line-oriented producers, a drained batch is one CloudTrail log
//! file: a single `{"Records":[...]}` document holding every event generated
//! since the last drain.

use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random::{self, pick};

const RECORDS_OPEN: &[u8] = b"{\"Records\":[";
const RECORDS_CLOSE: &[u8] = b"]}\n";

static EVENT_NAMES: &[&str] = &["PutObject", "GetObject", "DeleteObject", "ListObjects"];
static PRINCIPAL_IDS: &[&str] = &["AID1234567890", "AID0987654321", "AID1111222233", "AID7777888899"];
static ERRORS: &[(&str, &str)] = &[
    ("AccessDenied", "Access Denied"),
    ("NoSuchKey", "The specified key does not exist."),
    ("NoSuchBucket", "The specified bucket does not exist"),
    ("SlowDown", "Please reduce your request rate."),
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdentity {
    #[serde(rename = "type")]
    kind: &'static str,
    principal_id: &'static str,
    arn: String,
    account_id: &'static str,
    access_key_id: String,
    user_name: String,
}

#[derive(Serialize)]
struct TlsDetails {
    #[serde(rename = "tlsVersion")]
    tls_version: &'static str,
    #[serde(rename = "cipherSuite")]
    cipher_suite: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    event_version: &'static str,
    user_identity: UserIdentity,
    event_time: String,
    event_source: &'static str,
    event_name: &'static str,
    aws_region: &'static str,
    #[serde(rename = "sourceIPAddress")]
    source_ip_address: String,
    user_agent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'static str>,
    request_parameters: Value,
    response_elements: Value,
    #[serde(rename = "requestID")]
    request_id: String,
    #[serde(rename = "eventID")]
    event_id: String,
    read_only: bool,
    resources: [Value; 1],
    event_type: &'static str,
    management_event: bool,
    recipient_account_id: &'static str,
    #[serde(rename = "sharedEventID")]
    shared_event_id: String,
    event_category: &'static str,
    tls_details: TlsDetails,
}

/// Request parameters and the touched resource for an S3 event
fn request_and_resource(
    rng: &mut SmallRng,
    event_name: &str,
    account_id: &str,
) -> (Value, Value) {
    let bucket = format!("bucket-{:03}", rng.random_range(0..1000));
    if event_name == "ListObjects" {
        return (
            json!({ "bucketName": bucket, "maxKeys": 1000 }),
            json!({
                "ARN": format!("arn:aws:s3:::{bucket}"),
                "type": "AWS::S3::Bucket",
                "accountId": account_id,
            }),
        );
    }
    let key = format!("object_{}.txt", random::alnum_string(rng, 2));
    (
        json!({ "bucketName": bucket, "key": key }),
        json!({
            "ARN": format!("arn:aws:s3:::{bucket}/{key}"),
            "type": "AWS::S3::Object",
            "accountId": account_id,
        }),
    )
}

fn record(rng: &mut SmallRng) -> Record {
    let request_id = random::upper_alnum_string(rng, 12);
    let account_id = random::account_id(rng);
    let event_name = pick(rng, EVENT_NAMES);
    let (request_parameters, resource) = request_and_resource(rng, event_name, account_id);
    let user_name = format!("user{}", rng.random_range(0..10));

    // One event in ten fails
    let (error_code, error_message) = if rng.random_range(0..10) == 0 {
        let (code, message) = ERRORS[rng.random_range(0..ERRORS.len())];
        (Some(code), Some(message))
    } else {
        (None, None)
    };

    Record {
        event_version: "1.11",
        user_identity: UserIdentity {
            kind: "IAMUser",
            principal_id: pick(rng, PRINCIPAL_IDS),
            arn: format!("arn:aws:iam::{account_id}:user/{user_name}"),
            account_id,
            access_key_id: format!("AKIA{}", random::upper_alnum_string(rng, 16)),
            user_name,
        },
        event_time: random::iso8601_now(),
        event_source: "s3.amazonaws.com",
        event_name,
        aws_region: random::region(rng),
        source_ip_address: random::ip(rng),
        user_agent: pick(rng, random::USER_AGENTS),
        error_code,
        error_message,
        request_parameters,
        response_elements: json!({
            "requestId": request_id,
            "kmsKeyId": format!("arn:aws:kms:us-east-1:{account_id}:key/{}", random::uuid(rng)),
        }),
        request_id,
        event_id: random::uuid(rng),
        read_only: matches!(event_name, "GetObject" | "ListObjects"),
        resources: [resource],
        event_type: "AwsApiCall",
        management_event: false,
        recipient_account_id: account_id,
        shared_event_id: random::uuid(rng),
        event_category: "Data",
        tls_details: TlsDetails {
            tls_version: pick(rng, random::TLS_PROTOCOLS),
            cipher_suite: pick(rng, random::SSL_CIPHERS),
        },
    }
}

/// Buffers encoded events; the drain wraps them in one `Records` document.
///
/// The reported size is the sum of the encoded events, without the wrapper
/// or separators.
pub struct CloudTrailProducer {
    acc: Accumulator,
    rng: SmallRng,
    records: u64,
    encoded_size: u64,
    scratch: Vec<u8>,
}

impl CloudTrailProducer {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            acc: Accumulator::new(),
            rng,
            records: 0,
            encoded_size: 0,
            scratch: Vec::with_capacity(1024),
        }
    }
}

impl Producer for CloudTrailProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        let event = record(&mut self.rng);
        self.scratch.clear();
        serde_json::to_writer(&mut self.scratch, &event)?;

        if self.records > 0 {
            self.acc.write(b",");
        }
        self.acc.write(&self.scratch);
        self.records += 1;
        self.encoded_size += self.scratch.len() as u64;
        Ok(self.encoded_size)
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        let body = self.acc.drain_and_reset();
        self.records = 0;
        self.encoded_size = 0;

        let mut out = Vec::with_capacity(RECORDS_OPEN.len() + body.len() + RECORDS_CLOSE.len());
        out.extend_from_slice(RECORDS_OPEN);
        out.extend_from_slice(&body);
        out.extend_from_slice(RECORDS_CLOSE);
        out
    }
}
