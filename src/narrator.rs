//! Natural-language justifications for counter offers

use crate::error::{NegotiatorError, Result};
use crate::types::{Bundle, PartyId, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

/// How many transcript lines a prompt carries
pub const PROMPT_HISTORY_LINES: usize = 3;

/// Negotiating temperament
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Aggressive,
    Cooperative,
    #[default]
    Neutral,
}

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::Aggressive => {
                "You are a highly aggressive and firm negotiator. Your goal is to maximize \
                 your own profit at all costs. You use pressure tactics and show little \
                 flexibility. Keep your justifications short and demanding."
            }
            Persona::Cooperative => {
                "You are a fair and cooperative negotiator. You value long-term partnerships \
                 and seek a win-win outcome. Your tone is respectful and you explain the logic \
                 behind your prices to build trust."
            }
            Persona::Neutral => {
                "You are a professional and fact-based negotiator. You rely on data and \
                 commercial logic. Your communication is clear, concise, and focused on the \
                 transaction details."
            }
        }
    }
}

impl FromStr for Persona {
    type Err = NegotiatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aggressive" => Ok(Persona::Aggressive),
            "cooperative" => Ok(Persona::Cooperative),
            "neutral" => Ok(Persona::Neutral),
            other => Err(NegotiatorError::Configuration(format!(
                "unknown persona: {other}"
            ))),
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persona::Aggressive => write!(f, "aggressive"),
            Persona::Cooperative => write!(f, "cooperative"),
            Persona::Neutral => write!(f, "neutral"),
        }
    }
}

/// Everything a narrator needs to justify one counter offer
#[derive(Clone, Debug)]
pub struct NarrationRequest {
    pub party: PartyId,
    pub role: Role,
    pub persona: Persona,
    pub prices: Bundle,
    /// The party's transcript, oldest first
    pub history: Vec<String>,
}

/// Render the prompt for a language model
pub fn build_prompt(request: &NarrationRequest) -> String {
    let skip = request.history.len().saturating_sub(PROMPT_HISTORY_LINES);
    let history: Vec<String> = request.history[skip..]
        .iter()
        .map(|line| format!("- Offer: {line}"))
        .collect();

    format!(
        "You are a {role} in a commercial negotiation.\n\
         Your current strategic offer is: {prices}.\n\
         Recent history:\n\
         {history}\n\n\
         Persona: {persona}\n\n\
         Task: Write a concise message (max 2 sentences) to the other party justifying this offer.\n\
         Message:\n",
        role = request.role,
        prices = request.prices,
        history = history.join("\n"),
        persona = request.persona,
    )
}

/// Produces a justification for a counter offer.
///
/// Implementations may be slow (a model call); the arena awaits each one
/// before stepping the environment.
pub trait Narrator: Send + Sync {
    fn justify(&self, request: NarrationRequest) -> impl Future<Output = Result<String>> + Send;
}

/// Offline narrator built from persona templates
#[derive(Clone, Debug, Default)]
pub struct TemplateNarrator {
    latency: Option<Duration>,
}

impl TemplateNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering, to mimic a remote model
    pub fn with_latency(self, latency: Duration) -> Self {
        Self {
            latency: Some(latency),
        }
    }

    fn render(request: &NarrationRequest) -> String {
        let prices = &request.prices;
        let variant = request.history.len() % 2;
        match (request.persona, variant) {
            (Persona::Aggressive, 0) => format!(
                "This is our final offer at {prices}. Take it or we walk."
            ),
            (Persona::Aggressive, _) => format!(
                "{prices} is already a massive concession. Do not expect another one."
            ),
            (Persona::Cooperative, 0) => format!(
                "We have moved to {prices} so both sides keep healthy margins for a long-term partnership."
            ),
            (Persona::Cooperative, _) => format!(
                "At {prices} we think there is a fair deal here for both of us."
            ),
            (Persona::Neutral, 0) => format!(
                "Based on current procurement indices, {prices} is the efficient point for this transaction."
            ),
            (Persona::Neutral, _) => format!(
                "Our numbers put the bundle at {prices} given present inventory levels."
            ),
        }
    }
}

impl Narrator for TemplateNarrator {
    fn justify(&self, request: NarrationRequest) -> impl Future<Output = Result<String>> + Send {
        let latency = self.latency;
        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            Ok(Self::render(&request))
        }
    }
}
