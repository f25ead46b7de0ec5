use poise::serenity_prelude::Colour;

/// Tone of a reply, used to pick the embed colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Success,
    Info,
    Error,
}

/// A user-visible reply in the invoking context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub content: String,
    /// Only visible to the invoker where the platform supports it
    pub ephemeral: bool,
}

impl Reply {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Success,
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn info(content: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Info,
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            content: content.into(),
            ephemeral: false,
        }
    }

    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == ReplyKind::Error
    }

    #[must_use]
    pub fn colour(&self) -> Colour {
        match self.kind {
            ReplyKind::Success => Colour::DARK_GREEN,
            ReplyKind::Info => Colour::BLURPLE,
            ReplyKind::Error => Colour::RED,
        }
    }

    /// Text shown to the user, with the error marker where applicable
    #[must_use]
    pub fn rendered(&self) -> String {
        match self.kind {
            ReplyKind::Error => format!("❌  {}", self.content),
            ReplyKind::Success | ReplyKind::Info => self.content.clone(),
        }
    }
}

/// A titled embed posted to a guild's log channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPost {
    pub title: String,
    pub colour: Colour,
    pub description: Option<String>,
    /// `(name, value, inline)`
    pub fields: Vec<(String, String, bool)>,
    pub footer: Option<String>,
}

impl LogPost {
    pub fn new(title: impl Into<String>, colour: Colour) -> Self {
        Self {
            title: title.into(),
            colour,
            description: None,
            fields: Vec::new(),
            footer: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push((name.into(), value.into(), inline));
        self
    }

    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Field value by name, if present
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, v, _)| v.as_str())
    }
}
