use serde_json::Value;

/// One inbound frame from a player socket. Anything that does not parse
/// into a known shape is dropped without a reply; the session still counts
/// it as activity.
#[derive(Debug, PartialEq)]
pub enum ClientMessage {
    Hello {
        name: String,
    },
    Input {
        player_id: String,
        direction_rad: Option<f64>,
        boosting: Option<bool>,
    },
    Ping {
        ping_id: Option<u64>,
    },
    Pong {
        ping_id: u64,
    },
    /// Well-formed JSON with an unrecognized tag. Touches the session and
    /// nothing else.
    Unknown,
}

pub fn parse_client_message(raw: &str) -> Option<ClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            Some(ClientMessage::Hello { name })
        }
        "input" => {
            let player_id = object.get("playerId")?.as_str()?.to_string();
            // direction may legitimately arrive non-finite (overflowing
            // exponents); validation happens downstream where it can be
            // counted. A wrong type is malformed and drops here.
            let direction_rad = match object.get("directionRad") {
                None => None,
                Some(value) => Some(value.as_f64()?),
            };
            let boosting = match object.get("boosting") {
                None => None,
                Some(value) => Some(value.as_bool()?),
            };
            Some(ClientMessage::Input {
                player_id,
                direction_rad,
                boosting,
            })
        }
        "ping" => {
            let ping_id = match object.get("pingId") {
                None => None,
                Some(value) => Some(value.as_u64()?),
            };
            Some(ClientMessage::Ping { ping_id })
        }
        "pong" => {
            let ping_id = object.get("pingId")?.as_u64()?;
            Some(ClientMessage::Pong { ping_id })
        }
        _ => Some(ClientMessage::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","name":"Worm"}"#)
            .expect("hello message should parse");
        assert_eq!(
            parsed,
            ClientMessage::Hello {
                name: "Worm".to_string()
            }
        );
    }

    #[test]
    fn parse_hello_requires_name() {
        assert_eq!(parse_client_message(r#"{"type":"hello"}"#), None);
    }

    #[test]
    fn parse_input_message() {
        let parsed = parse_client_message(
            r#"{"type":"input","playerId":"player_1","directionRad":1.5,"boosting":true}"#,
        )
        .expect("input message should parse");
        match parsed {
            ClientMessage::Input {
                player_id,
                direction_rad,
                boosting,
            } => {
                assert_eq!(player_id, "player_1");
                assert_eq!(direction_rad, Some(1.5));
                assert_eq!(boosting, Some(true));
            }
            _ => panic!("expected input message"),
        }
    }

    #[test]
    fn parse_input_allows_missing_optionals() {
        let parsed = parse_client_message(r#"{"type":"input","playerId":"player_1"}"#)
            .expect("input without direction should parse");
        assert!(matches!(
            parsed,
            ClientMessage::Input {
                direction_rad: None,
                boosting: None,
                ..
            }
        ));
    }

    #[test]
    fn parse_input_rejects_wrong_direction_type() {
        let parsed =
            parse_client_message(r#"{"type":"input","playerId":"player_1","directionRad":"up"}"#);
        assert_eq!(parsed, None);
    }

    #[test]
    fn parse_input_requires_player_id() {
        assert_eq!(
            parse_client_message(r#"{"type":"input","directionRad":0.4}"#),
            None
        );
    }

    #[test]
    fn parse_ping_with_and_without_id() {
        assert_eq!(
            parse_client_message(r#"{"type":"ping","pingId":7}"#),
            Some(ClientMessage::Ping { ping_id: Some(7) })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"ping"}"#),
            Some(ClientMessage::Ping { ping_id: None })
        );
    }

    #[test]
    fn parse_pong_requires_id() {
        assert_eq!(
            parse_client_message(r#"{"type":"pong","pingId":1712}"#),
            Some(ClientMessage::Pong { ping_id: 1712 })
        );
        assert_eq!(parse_client_message(r#"{"type":"pong"}"#), None);
    }

    #[test]
    fn unknown_tag_is_distinguished_from_malformed() {
        assert_eq!(
            parse_client_message(r#"{"type":"teleport","x":0}"#),
            Some(ClientMessage::Unknown)
        );
        assert_eq!(parse_client_message("not json at all"), None);
        assert_eq!(parse_client_message(r#"["type","hello"]"#), None);
        assert_eq!(parse_client_message(r#"{"name":"NoTag"}"#), None);
    }
}
