use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse segment classification used to route outreach templates.
///
/// The enum is closed: any unrecognized persona string from an LLM or the
/// deterministic fallback maps to `Unknown` rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Enterprise,
    Smb,
    Startup,
    Individual,
    Unknown,
}

impl Persona {
    /// Map a free-text persona label (as returned by a scoring model) onto
    /// the closed enum. Case-insensitive. `"mid-market"` is folded into
    /// `Smb`, matching the fallback heuristic's historical behavior.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "enterprise" => Persona::Enterprise,
            "smb" | "mid-market" | "midmarket" | "small-business" => Persona::Smb,
            "startup" => Persona::Startup,
            "individual" => Persona::Individual,
            _ => Persona::Unknown,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Persona::Enterprise => "enterprise",
            Persona::Smb => "smb",
            Persona::Startup => "startup",
            Persona::Individual => "individual",
            Persona::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Persona {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Persona::from_label(s))
    }
}

/// Lead lifecycle state. See `LeadStatus::can_transition_to` for the
/// allowed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Raw,
    Scored,
    Contacted,
    Responded,
    Converted,
    Failed,
    Snoozed,
}

impl LeadStatus {
    /// True once a lead has passed through the orchestrator at least once.
    pub fn is_at_least_contacted(&self) -> bool {
        matches!(
            self,
            LeadStatus::Contacted | LeadStatus::Responded | LeadStatus::Converted
        )
    }

    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        use LeadStatus::*;
        match (self, next) {
            (Raw, Scored) => true,
            (Scored, Contacted) => true,
            (Contacted, Responded) => true,
            (Contacted, Converted) => true,
            (Responded, Converted) => true,
            // snoozed is a manual side-branch reachable from any
            // pre-contacted state, and returnable to that state.
            (Raw | Scored, Snoozed) => true,
            (Snoozed, Raw | Scored) => true,
            (_, Failed) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeadStatus::Raw => "raw",
            LeadStatus::Scored => "scored",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Responded => "responded",
            LeadStatus::Converted => "converted",
            LeadStatus::Failed => "failed",
            LeadStatus::Snoozed => "snoozed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(LeadStatus::Raw),
            "scored" => Ok(LeadStatus::Scored),
            "contacted" => Ok(LeadStatus::Contacted),
            "responded" => Ok(LeadStatus::Responded),
            "converted" => Ok(LeadStatus::Converted),
            "failed" => Ok(LeadStatus::Failed),
            "snoozed" => Ok(LeadStatus::Snoozed),
            other => Err(format!("unknown lead status: {other}")),
        }
    }
}

/// Delivery channel for an outreach template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Linkedin,
    Slack,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Email => "email",
            Channel::Linkedin => "linkedin",
            Channel::Slack => "slack",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "linkedin" => Ok(Channel::Linkedin),
            "slack" => Ok(Channel::Slack),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// OutreachLog lifecycle. `pending -> sent -> delivered -> opened -> clicked
/// -> replied`, with `sent -> {bounced, failed, unsubscribed}` branching off.
/// Later engagement stages may be observed without earlier ones (a webhook
/// can report `clicked` without ever reporting `delivered`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Replied,
    Bounced,
    Unsubscribed,
    Failed,
}

impl fmt::Display for OutreachStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutreachStatus::Pending => "pending",
            OutreachStatus::Sent => "sent",
            OutreachStatus::Delivered => "delivered",
            OutreachStatus::Opened => "opened",
            OutreachStatus::Clicked => "clicked",
            OutreachStatus::Replied => "replied",
            OutreachStatus::Bounced => "bounced",
            OutreachStatus::Unsubscribed => "unsubscribed",
            OutreachStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OutreachStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutreachStatus::Pending),
            "sent" => Ok(OutreachStatus::Sent),
            "delivered" => Ok(OutreachStatus::Delivered),
            "opened" => Ok(OutreachStatus::Opened),
            "clicked" => Ok(OutreachStatus::Clicked),
            "replied" => Ok(OutreachStatus::Replied),
            "bounced" => Ok(OutreachStatus::Bounced),
            "unsubscribed" => Ok(OutreachStatus::Unsubscribed),
            "failed" => Ok(OutreachStatus::Failed),
            other => Err(format!("unknown outreach status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_maps_mid_market_to_smb() {
        assert_eq!(Persona::from_label("Mid-Market"), Persona::Smb);
        assert_eq!(Persona::from_label("ENTERPRISE"), Persona::Enterprise);
        assert_eq!(Persona::from_label("whatever-this-is"), Persona::Unknown);
    }

    #[test]
    fn lead_status_transitions() {
        assert!(LeadStatus::Raw.can_transition_to(LeadStatus::Scored));
        assert!(LeadStatus::Scored.can_transition_to(LeadStatus::Contacted));
        assert!(!LeadStatus::Raw.can_transition_to(LeadStatus::Contacted));
        assert!(LeadStatus::Contacted.can_transition_to(LeadStatus::Converted));
        assert!(LeadStatus::Contacted.is_at_least_contacted());
        assert!(!LeadStatus::Scored.is_at_least_contacted());
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        for s in [
            LeadStatus::Raw,
            LeadStatus::Scored,
            LeadStatus::Contacted,
            LeadStatus::Responded,
            LeadStatus::Converted,
            LeadStatus::Failed,
            LeadStatus::Snoozed,
        ] {
            let rendered = s.to_string();
            assert_eq!(LeadStatus::from_str(&rendered).unwrap(), s);
        }
    }
}
