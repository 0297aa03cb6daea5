//! Inbound chat commands.

/// A parsed chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Subscribe,
  Unsubscribe,
  Unknown(String),
}

impl Command {
  /// Parse message text. Group chats address bots as `/command@botname`;
  /// the suffix is ignored.
  pub fn parse(text: &str) -> Self {
    let text = text.trim();
    let word = text.split_whitespace().next().unwrap_or_default();
    let name = word.split('@').next().unwrap_or_default();
    match name {
      "/subscribe" => Self::Subscribe,
      "/unsubscribe" => Self::Unsubscribe,
      _ => Self::Unknown(text.to_owned()),
    }
  }
}
