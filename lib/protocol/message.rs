use serde::{Deserialize, Serialize};

/// The body of both the move request and the draw-response request.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct MoveRequest {
    /// The identifier of the model that should answer.
    pub model: String,
    /// The current position in FEN.
    pub game_state: String,
    /// Every move played so far in algebraic notation.
    pub move_history: Vec<String>,
}

/// A special action a model may take instead of moving.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Resign,
    DrawOffer,
    DrawAccept,
    DrawDecline,
    #[serde(other)]
    Unknown,
}

/// The terminal payload of a move request.
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResultPayload {
    #[serde(default, rename = "move", skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_tokens: Option<u64>,
}

/// What a model decided to do on its turn.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Reply {
    /// A move in algebraic notation, exactly as the model wrote it.
    Move(String),
    Resign,
    DrawOffer,
}

impl ResultPayload {
    /// Interprets the payload, where actions take precedence over moves.
    ///
    /// Returns `None` if the payload carries neither.
    pub fn reply(&self) -> Option<Reply> {
        match (self.action, &self.san) {
            (Some(Action::Resign), _) => Some(Reply::Resign),
            (Some(Action::DrawOffer), _) => Some(Reply::DrawOffer),
            (_, Some(san)) => Some(Reply::Move(san.clone())),
            _ => None,
        }
    }
}

/// The answer to a draw offer.
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct DrawReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_tokens: Option<u64>,
}

impl DrawReply {
    /// Only an explicit acceptance counts, anything else declines.
    pub fn accepts(&self) -> bool {
        self.action == Some(Action::DrawAccept)
    }
}

/// The answer of the health endpoint.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn move_request_uses_the_wire_field_names() {
        let request = MoveRequest {
            model: "o4-mini".into(),
            game_state: "8/8/8/8/8/8/8/8 w - - 0 1".into(),
            move_history: vec!["e4".into()],
        };

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "o4-mini",
                "game_state": "8/8/8/8/8/8/8/8 w - - 0 1",
                "move_history": ["e4"],
            })
        );
    }

    #[test]
    fn result_payload_may_carry_a_move() {
        let payload: ResultPayload = from_str(r#"{"move": "Nf3", "thinking_tokens": 42}"#).unwrap();
        assert_eq!(payload.reply(), Some(Reply::Move("Nf3".into())));
        assert_eq!(payload.thinking_tokens, Some(42));
    }

    #[test]
    fn result_payload_may_carry_an_action() {
        let payload: ResultPayload = from_str(r#"{"action": "resign"}"#).unwrap();
        assert_eq!(payload.reply(), Some(Reply::Resign));
        assert_eq!(payload.thinking_tokens, None);

        let payload: ResultPayload = from_str(r#"{"action": "draw_offer", "thinking_tokens": null}"#).unwrap();
        assert_eq!(payload.reply(), Some(Reply::DrawOffer));
    }

    #[test]
    fn actions_take_precedence_over_moves() {
        let payload: ResultPayload = from_str(r#"{"move": "e4", "action": "resign"}"#).unwrap();
        assert_eq!(payload.reply(), Some(Reply::Resign));
    }

    #[test]
    fn unknown_actions_fall_back_to_the_move() {
        let payload: ResultPayload = from_str(r#"{"move": "e4", "action": "castle"}"#).unwrap();
        assert_eq!(payload.action, Some(Action::Unknown));
        assert_eq!(payload.reply(), Some(Reply::Move("e4".into())));
    }

    #[test]
    fn empty_result_payload_has_no_reply() {
        assert_eq!(ResultPayload::default().reply(), None);
    }

    #[test]
    fn only_explicit_acceptance_accepts_a_draw() {
        let accept: DrawReply = from_str(r#"{"action": "draw_accept", "thinking_tokens": 7}"#).unwrap();
        let decline: DrawReply = from_str(r#"{"action": "draw_decline"}"#).unwrap();
        let other: DrawReply = from_str(r#"{"action": "shrug"}"#).unwrap();
        let missing: DrawReply = from_str("{}").unwrap();

        assert!(accept.accepts());
        assert!(!decline.accepts());
        assert!(!other.accepts());
        assert!(!missing.accepts());
    }
}
