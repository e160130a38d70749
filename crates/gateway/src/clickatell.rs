//! Client for the legacy Clickatell SOAP (document/literal) API.
//!
//! The wire contract is literal and specific to this gateway: `auth`
//! answers with a bare string whose "OK"-prefixed form carries the session
//! token from offset 4 onward, and `sendmsg` answers with a list of strings
//! whose first element is "ID"-prefixed on success. Both prefix checks are
//! case-insensitive. A different SMS provider needs its own adapter; none
//! of these parsing rules generalize.

use std::time::Duration;

use async_trait::async_trait;

use crate::{GatewayError, SmsGateway, SmsMessage};

pub const GATEWAY_ENDPOINT: &str = "http://api.clickatell.com/soap/document_literal/webservice";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const SOAP_NS: &str = "http://api.clickatell.com/soap/webservice";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_id: u32,
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct ClickatellClient {
    endpoint: String,
    credentials: Credentials,
    http_client: reqwest::Client,
}

impl ClickatellClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, GatewayError> {
        Self::with_endpoint(GATEWAY_ENDPOINT.to_string(), credentials, timeout)
    }

    /// Endpoint override for tests pointed at a local stub.
    pub fn with_endpoint(
        endpoint: String,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            credentials,
            http_client,
        })
    }

    fn auth_envelope(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <auth xmlns="{ns}">
      <api_id>{api_id}</api_id>
      <user>{user}</user>
      <password>{password}</password>
    </auth>
  </soap:Body>
</soap:Envelope>"#,
            ns = SOAP_NS,
            api_id = self.credentials.api_id,
            user = xml_escape(&self.credentials.username),
            password = xml_escape(&self.credentials.password),
        )
    }

    /// The legacy `sendmsg` operation takes a fixed tail of tuning
    /// parameters: thirteen numerics held at 0 and four strings held empty.
    fn sendmsg_envelope(&self, session_id: &str, message: &SmsMessage) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <sendmsg xmlns="{ns}">
      <session_id>{session_id}</session_id>
      <api_id>{api_id}</api_id>
      <user>{user}</user>
      <password>{password}</password>
      <to>{recipient}</to>
      <from></from>
      <text>{text}</text>
      <concat>0</concat>
      <deliv_ack>0</deliv_ack>
      <callback>0</callback>
      <deliv_time>0</deliv_time>
      <max_credits>0</max_credits>
      <req_feat>0</req_feat>
      <queue>0</queue>
      <escalate>0</escalate>
      <mo>0</mo>
      <unicode>0</unicode>
      <validity>0</validity>
      <binary>0</binary>
      <scheduled_time>0</scheduled_time>
      <cliMsgId></cliMsgId>
      <msg_type></msg_type>
      <udh></udh>
    </sendmsg>
  </soap:Body>
</soap:Envelope>"#,
            ns = SOAP_NS,
            session_id = xml_escape(session_id),
            api_id = self.credentials.api_id,
            user = xml_escape(&self.credentials.username),
            password = xml_escape(&self.credentials.password),
            recipient = xml_escape(&message.recipient),
            text = xml_escape(&message.text),
        )
    }

    async fn call(&self, action: &str, envelope: String) -> Result<String, GatewayError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("{SOAP_NS}#{action}"))
            .body(envelope)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SmsGateway for ClickatellClient {
    async fn submit(&self, message: &SmsMessage) -> Result<String, GatewayError> {
        let auth_body = self.call("auth", self.auth_envelope()).await?;
        let auth_response = return_values(&auth_body)?
            .into_iter()
            .next()
            .unwrap_or_default();
        let session_id = session_from_auth(&auth_response)?;

        let send_body = self
            .call("sendmsg", self.sendmsg_envelope(&session_id, message))
            .await?;
        let message_id = message_id_from_send(&return_values(&send_body)?)?;

        tracing::debug!(%message_id, recipient = %message.recipient, "message accepted by gateway");
        Ok(message_id)
    }
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Collect the text of every `<return>` element, ignoring namespaces.
fn return_values(body: &str) -> Result<Vec<String>, GatewayError> {
    let doc = roxmltree::Document::parse(body)
        .map_err(|e| GatewayError::Protocol(format!("unparseable SOAP response: {e}")))?;
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "return")
        .filter_map(|n| n.text())
        .map(|s| s.trim().to_string())
        .collect())
}

/// Auth responses are "OK"-prefixed on success; the session token is the
/// response with its first 4 characters dropped ("OK:abc123" -> "bc123").
fn session_from_auth(response: &str) -> Result<String, GatewayError> {
    if !response.to_uppercase().starts_with("OK") {
        return Err(GatewayError::AuthRejected {
            response: response.to_string(),
        });
    }
    Ok(response.chars().skip(4).collect())
}

/// The first `sendmsg` return value is "ID"-prefixed on success.
fn message_id_from_send(values: &[String]) -> Result<String, GatewayError> {
    match values.first() {
        Some(first) if first.to_uppercase().starts_with("ID") => Ok(first.clone()),
        Some(first) => Err(GatewayError::SendRejected {
            response: first.clone(),
        }),
        None => Err(GatewayError::SendRejected {
            response: String::new(),
        }),
    }
}
