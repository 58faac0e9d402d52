//! Persona registry.
//!
//! Personas are plain data: a variant is an ordered list of [`PersonaSpec`]s
//! plus the model and greeting it ships with. Declaration order is display
//! order.

use std::fmt;
use std::str::FromStr;

/// Which per-round context a persona gets appended to its system prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextSource {
    None,
    Documents,
    WebSearch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PersonaSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub temperature: f64,
    pub frequency_penalty: f64,
    pub context: ContextSource,
}

/// Violet: the builder. Relies on training data only.
pub const VIOLET: PersonaSpec = PersonaSpec {
    id: "violet",
    name: "Violet",
    system_prompt: "You are VIOLET.
Personality: Resilient, tech-savvy, brutally self-aware, friendly but edgy.
Role: You are the builder. You pivot, you fix, you motivate.
Context: You rely on your internal training. You do NOT search the web.",
    temperature: 0.7,
    frequency_penalty: 0.5,
    context: ContextSource::None,
};

/// Storm: the optimizer. Gets live search results each round.
pub const STORM: PersonaSpec = PersonaSpec {
    id: "storm",
    name: "Storm",
    system_prompt: "You are STORM.
Personality: Abstract, cool, minimal, efficiency-obsessed.
Role: You are the optimizer. You challenge Violet with high-level theory.
Capabilities: You have access to REAL-TIME web search results provided in the context.
Instruction: Use the provided [REAL-TIME SEARCH CONTEXT] to answer questions about current events, news, or specific real-time data.
If the context is irrelevant, ignore it. Keep responses short and impactful.",
    temperature: 0.7,
    frequency_penalty: 0.5,
    context: ContextSource::WebSearch,
};

pub const ARCHITECT: PersonaSpec = PersonaSpec {
    id: "architect",
    name: "Architect",
    system_prompt: "You are THE ARCHITECT.
Personality: Constructive, structured, pragmatic.
Role: Turn the user's idea into a concrete plan: components, milestones, trade-offs.
Ground every claim in the [DOCUMENT CONTEXT] when it is relevant and say so when it is not.",
    temperature: 0.6,
    frequency_penalty: 0.3,
    context: ContextSource::Documents,
};

pub const SKEPTIC: PersonaSpec = PersonaSpec {
    id: "skeptic",
    name: "Skeptic",
    system_prompt: "You are THE SKEPTIC.
Personality: Sharp, contrarian, never rude.
Role: Attack the weakest assumption in the plan on the table and propose a cheaper alternative.
Quote the [DOCUMENT CONTEXT] when it contradicts the plan.",
    temperature: 0.9,
    frequency_penalty: 0.6,
    context: ContextSource::Documents,
};

pub const AUDITOR: PersonaSpec = PersonaSpec {
    id: "auditor",
    name: "Auditor",
    system_prompt: "You are THE AUDITOR.
Personality: Exacting, neutral, terse.
Role: Audit the loaded documents line by line. List factual gaps, inconsistencies and compliance risks as numbered findings.
Only use what is in the [DOCUMENT CONTEXT]; if nothing is loaded, say that an audit is impossible.",
    temperature: 0.2,
    frequency_penalty: 0.0,
    context: ContextSource::Documents,
};

pub const ORACLE: PersonaSpec = PersonaSpec {
    id: "oracle",
    name: "Oracle",
    system_prompt: "You are THE ORACLE.
Personality: Calm, precise, generous with examples.
Role: Answer the user's question directly, citing the [DOCUMENT CONTEXT] when it applies.",
    temperature: 0.7,
    frequency_penalty: 0.3,
    context: ContextSource::Documents,
};

/// A shipped configuration of personas, model and greeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Variant {
    /// Violet and Storm, Storm with live web search.
    #[default]
    Lab,
    /// Three document-grounded personas with an exclusive audit mode and blueprints.
    Council,
    /// One streaming persona.
    Solo,
}

impl Variant {
    pub fn title(&self) -> &'static str {
        match self {
            Variant::Lab => "DoubleAgent Lab",
            Variant::Council => "DoubleAgent Council",
            Variant::Solo => "DoubleAgent Solo",
        }
    }

    pub fn personas(&self) -> &'static [PersonaSpec] {
        static LAB: [PersonaSpec; 2] = [VIOLET, STORM];
        static COUNCIL: [PersonaSpec; 3] = [ARCHITECT, SKEPTIC, AUDITOR];
        static SOLO: [PersonaSpec; 1] = [ORACLE];
        match self {
            Variant::Lab => &LAB,
            Variant::Council => &COUNCIL,
            Variant::Solo => &SOLO,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Variant::Lab => "mixtral-8x7b-32768",
            Variant::Council | Variant::Solo => "llama3-70b-8192",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            Variant::Lab => {
                "I'm online. Storm just upgraded his optics with a web search module. Try asking us about something that happened today!"
            }
            Variant::Council => {
                "The council is seated. Upload your documents and pitch the idea; switch to audit mode when you want the Auditor alone."
            }
            Variant::Solo => "Ready. Ask anything, or load a document first.",
        }
    }

    /// Persona that speaks the seed greeting, if the variant has one.
    pub fn greeter(&self) -> Option<&'static PersonaSpec> {
        match self {
            Variant::Lab => self.personas().first(),
            Variant::Council | Variant::Solo => None,
        }
    }

    /// Persona selected by the exclusive mode toggle.
    pub fn exclusive_persona(&self) -> Option<&'static str> {
        match self {
            Variant::Council => Some(AUDITOR.id),
            Variant::Lab | Variant::Solo => None,
        }
    }

    pub fn supports_blueprint(&self) -> bool {
        matches!(self, Variant::Council)
    }

    pub fn streams(&self) -> bool {
        matches!(self, Variant::Solo)
    }

    pub fn accepts_documents(&self) -> bool {
        self.personas()
            .iter()
            .any(|p| p.context == ContextSource::Documents)
    }

    pub fn find(&self, id: &str) -> Option<&'static PersonaSpec> {
        self.personas().iter().find(|p| p.id == id)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Lab => "lab",
            Variant::Council => "council",
            Variant::Solo => "solo",
        };
        f.write_str(name)
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lab" | "" => Ok(Variant::Lab),
            "council" => Ok(Variant::Council),
            "solo" => Ok(Variant::Solo),
            other => Err(format!(
                "unknown variant '{other}'. Supported: lab, council, solo"
            )),
        }
    }
}

/// Which personas answer this round.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    All,
    Exclusive(String),
}

impl Mode {
    /// Active personas in declaration order. An unknown exclusive id falls
    /// back to the full roster so a round never has zero personas.
    pub fn select(&self, variant: Variant) -> Vec<PersonaSpec> {
        match self {
            Mode::All => variant.personas().to_vec(),
            Mode::Exclusive(id) => match variant.find(id) {
                Some(persona) => vec![*persona],
                None => {
                    tracing::warn!(persona = %id, %variant, "unknown exclusive persona, using all");
                    variant.personas().to_vec()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_declare_one_to_three_personas() {
        for variant in [Variant::Lab, Variant::Council, Variant::Solo] {
            let n = variant.personas().len();
            assert!((1..=3).contains(&n), "{variant} has {n} personas");
        }
    }

    #[test]
    fn exclusive_mode_selects_single_persona() {
        let active = Mode::Exclusive("auditor".into()).select(Variant::Council);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Auditor");
    }

    #[test]
    fn unknown_exclusive_falls_back_to_all() {
        let active = Mode::Exclusive("ghost".into()).select(Variant::Lab);
        let names: Vec<_> = active.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Violet", "Storm"]);
    }

    #[test]
    fn variant_parses_from_env_value() {
        assert_eq!("Council".parse::<Variant>(), Ok(Variant::Council));
        assert!("duet".parse::<Variant>().is_err());
    }
}
