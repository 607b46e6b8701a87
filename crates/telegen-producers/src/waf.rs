//! AWS WAF web ACL logs, one JSON object per line

use rand::rngs::SmallRng;
use serde::Serialize;
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random::{self, pick};

static RULE_IDS: &[&str] = &["rule-1", "rule-2", "rule-3", "rule-4", "rule-5"];
static RULE_TYPES: &[&str] = &["REGULAR", "RATE_BASED", "GROUP"];
static ACTIONS: &[&str] = &["ALLOW", "BLOCK", "COUNT"];
static SOURCE_NAMES: &[&str] = &["ALB", "CloudFront", "API Gateway"];
static SOURCE_IDS: &[&str] = &["E2A1BCD34FGH56", "E3B2CDE45GHI67", "E4C3DEF56HIJ78", "E5D4EFG67IJK89"];

#[derive(Serialize)]
struct Header<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequest<'a> {
    client_ip: String,
    country: &'a str,
    headers: [Header<'a>; 4],
    uri: &'a str,
    args: &'a str,
    http_version: &'a str,
    http_method: &'a str,
    #[serde(rename = "requestId")]
    request_id: String,
    fragment: &'a str,
    scheme: &'a str,
    host: &'a str,
}

#[derive(Serialize)]
struct WafLine<'a> {
    timestamp: i64,
    #[serde(rename = "formatVersion")]
    format_version: u8,
    #[serde(rename = "webaclId")]
    web_acl_id: &'a str,
    #[serde(rename = "terminatingRuleId")]
    terminating_rule_id: &'a str,
    #[serde(rename = "terminatingRuleType")]
    terminating_rule_type: &'a str,
    action: &'a str,
    #[serde(rename = "httpSourceName")]
    http_source_name: &'a str,
    #[serde(rename = "httpSourceId")]
    http_source_id: &'a str,
    #[serde(rename = "responseCodeSent")]
    response_code_sent: Option<u16>,
    #[serde(rename = "httpRequest")]
    http_request: HttpRequest<'a>,
}

pub struct WafProducer {
    acc: Accumulator,
    rng: SmallRng,
    web_acl_id: String,
    line: Vec<u8>,
}

impl WafProducer {
    /// The web ACL is picked once, so every line from one producer shares it
    pub fn new(mut rng: SmallRng) -> Self {
        let web_acl_id = format!(
            "arn:aws:wafv2:{}:{}:regional/webacl/sample-web-acl/{}",
            random::region(&mut rng),
            random::account_id(&mut rng),
            random::uuid(&mut rng),
        );
        Self {
            acc: Accumulator::new(),
            rng,
            web_acl_id,
            line: Vec::with_capacity(768),
        }
    }

    pub fn web_acl_id(&self) -> &str {
        &self.web_acl_id
    }
}

impl Producer for WafProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        let rng = &mut self.rng;
        let action = pick(rng, ACTIONS);
        let entry = WafLine {
            timestamp: chrono::Utc::now().timestamp_millis(),
            format_version: 1,
            web_acl_id: &self.web_acl_id,
            terminating_rule_id: if action == "ALLOW" { "Default_Action" } else { pick(rng, RULE_IDS) },
            terminating_rule_type: pick(rng, RULE_TYPES),
            action,
            http_source_name: pick(rng, SOURCE_NAMES),
            http_source_id: pick(rng, SOURCE_IDS),
            response_code_sent: (action == "BLOCK").then_some(403),
            http_request: HttpRequest {
                client_ip: random::ip(rng),
                country: pick(rng, random::COUNTRY_CODES),
                headers: [
                    Header {
                        name: "Content-Type",
                        value: pick(rng, random::CONTENT_TYPES),
                    },
                    Header {
                        name: "User-Agent",
                        value: pick(rng, random::USER_AGENTS),
                    },
                    Header {
                        name: "Accept",
                        value: "*/*",
                    },
                    Header {
                        name: "Connection",
                        value: "keep-alive",
                    },
                ],
                uri: pick(rng, random::URI_PATHS),
                args: pick(rng, random::QUERY_STRINGS),
                http_version: "HTTP/1.1",
                http_method: pick(rng, random::HTTP_METHODS),
                request_id: random::upper_alnum_string(rng, 8),
                fragment: pick(rng, random::FRAGMENTS),
                scheme: pick(rng, random::HTTP_SCHEMES),
                host: pick(rng, random::DOMAINS),
            },
        };

        self.line.clear();
        serde_json::to_writer(&mut self.line, &entry)?;
        self.line.push(b'\n');
        self.acc.write(&self.line);
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.acc.drain_and_reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn web_acl_fixed_per_producer() {
        let mut p = WafProducer::new(SmallRng::seed_from_u64(4));
        for _ in 0..5 {
            p.generate().unwrap();
        }
        let out = String::from_utf8(p.drain_and_reset()).unwrap();
        let acl = p.web_acl_id().to_string();
        assert!(acl.starts_with("arn:aws:wafv2:"));
        for line in out.lines() {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["webaclId"], acl.as_str());
        }
    }

    #[test]
    fn line_shape() {
        let mut p = WafProducer::new(SmallRng::seed_from_u64(4));
        p.generate().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&p.drain_and_reset()).unwrap();

        assert!(v["timestamp"].as_i64().unwrap() > 1_600_000_000_000);
        let action = v["action"].as_str().unwrap();
        assert!(["ALLOW", "BLOCK", "COUNT"].contains(&action));
        assert_eq!(v["responseCodeSent"].is_null(), action != "BLOCK");
        let req = &v["httpRequest"];
        assert_eq!(req["headers"].as_array().unwrap().len(), 4);
        assert_eq!(req["httpVersion"], "HTTP/1.1");
        assert_eq!(req["requestId"].as_str().unwrap().len(), 8);
        assert!(req["clientIp"].as_str().unwrap().contains('.'));
    }
}
