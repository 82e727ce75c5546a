//! Emergency call placement.
//!
//! Thin wrapper over the Twilio REST API: a configured caller number dials a
//! named contact (fire, ambulance, police, manager) or an explicit number and
//! speaks a message. Calls are best-effort with a bounded timeout; a failed
//! call is an error the API reports, never a crash.
//!
//! Credentials come from the environment (`TWILIO_ACCOUNT_SID`,
//! `TWILIO_AUTH_TOKEN`, `TWILIO_CALLER_NUMBER`), contact numbers from
//! `EMERGENCY_FIRE` / `EMERGENCY_AMBULANCE` / `EMERGENCY_POLICE` /
//! `EMERGENCY_MANAGER`.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::Serialize;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub const CONTACT_NAMES: [&str; 4] = ["fire", "ambulance", "police", "manager"];

#[derive(Clone, Debug, Default)]
pub struct VoiceConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub caller_number: Option<String>,
    /// Contact name -> phone number.
    pub contacts: BTreeMap<String, String>,
}

impl VoiceConfig {
    pub fn from_env() -> Self {
        let mut contacts = BTreeMap::new();
        for name in CONTACT_NAMES {
            let var = format!("EMERGENCY_{}", name.to_uppercase());
            if let Ok(number) = std::env::var(&var) {
                if !number.trim().is_empty() {
                    contacts.insert(name.to_string(), number.trim().to_string());
                }
            }
        }
        Self {
            account_sid: non_empty_env("TWILIO_ACCOUNT_SID"),
            auth_token: non_empty_env("TWILIO_AUTH_TOKEN"),
            caller_number: non_empty_env("TWILIO_CALLER_NUMBER"),
            contacts,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.caller_number.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone, Debug, Serialize)]
pub struct VoiceStatus {
    pub configured: bool,
    pub caller_number: Option<String>,
    pub contacts: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CallOutcome {
    pub contact: Option<String>,
    pub to: String,
    pub queued: bool,
}

pub struct EmergencyDialer {
    cfg: VoiceConfig,
    agent: ureq::Agent,
}

impl EmergencyDialer {
    pub fn new(cfg: VoiceConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(CALL_TIMEOUT).build();
        Self { cfg, agent }
    }

    pub fn status(&self) -> VoiceStatus {
        VoiceStatus {
            configured: self.cfg.is_configured(),
            caller_number: self.cfg.caller_number.clone(),
            contacts: self.cfg.contacts.keys().cloned().collect(),
        }
    }

    /// Dial a named contact with the standard site-emergency message.
    pub fn call_contact(&self, name: &str) -> Result<CallOutcome> {
        let number = self
            .cfg
            .contacts
            .get(name)
            .ok_or_else(|| anyhow!("unknown emergency contact '{}'", name))?
            .clone();
        let message = format!(
            "This is an automated emergency call from the SafeSite construction \
             safety system. The {} contact has been requested. Please respond.",
            name
        );
        let mut outcome = self.call_number(&number, &message)?;
        outcome.contact = Some(name.to_string());
        Ok(outcome)
    }

    /// Dial an explicit number with a custom spoken message.
    pub fn call_number(&self, to: &str, message: &str) -> Result<CallOutcome> {
        let sid = self
            .cfg
            .account_sid
            .as_deref()
            .ok_or_else(|| anyhow!("TWILIO_ACCOUNT_SID not configured"))?;
        let token = self
            .cfg
            .auth_token
            .as_deref()
            .ok_or_else(|| anyhow!("TWILIO_AUTH_TOKEN not configured"))?;
        let from = self
            .cfg
            .caller_number
            .as_deref()
            .ok_or_else(|| anyhow!("TWILIO_CALLER_NUMBER not configured"))?;

        let url = format!("{}/Accounts/{}/Calls.json", TWILIO_API_BASE, sid);
        let auth = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", sid, token));
        let twiml = format!("<Response><Say>{}</Say></Response>", xml_escape(message));

        self.agent
            .post(&url)
            .set("Authorization", &format!("Basic {}", auth))
            .send_form(&[("To", to), ("From", from), ("Twiml", twiml.as_str())])
            .context("place emergency call")?;

        log::info!("emergency call queued to {}", to);
        Ok(CallOutcome {
            contact: None,
            to: to.to_string(),
            queued: true,
        })
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
