use courier_server::room::RoomRef;

#[test]
fn parses_channel_reference() {
    assert_eq!(
        RoomRef::parse("server:3:channel:5"),
        Some(RoomRef::Channel {
            server_id: 3,
            channel_id: 5
        })
    );
}

#[test]
fn parses_dm_reference() {
    assert_eq!(RoomRef::parse("dm:7"), Some(RoomRef::Dm { dm_id: 7 }));
}

#[test]
fn rejects_unknown_tag() {
    assert_eq!(RoomRef::parse("group:7"), None);
    assert_eq!(RoomRef::parse("channel:5"), None);
}

#[test]
fn rejects_wrong_arity() {
    assert_eq!(RoomRef::parse("server:3:channel"), None);
    assert_eq!(RoomRef::parse("server:3"), None);
    assert_eq!(RoomRef::parse("server:3:channel:5:extra"), None);
    assert_eq!(RoomRef::parse("dm"), None);
    assert_eq!(RoomRef::parse("dm:7:8"), None);
}

#[test]
fn rejects_non_numeric_ids() {
    assert_eq!(RoomRef::parse("server:abc:channel:5"), None);
    assert_eq!(RoomRef::parse("server:3:channel:xyz"), None);
    assert_eq!(RoomRef::parse("dm:seven"), None);
    assert_eq!(RoomRef::parse("dm:"), None);
}

#[test]
fn rejects_wrong_middle_keyword() {
    assert_eq!(RoomRef::parse("server:3:chan:5"), None);
}

#[test]
fn rejects_empty_string() {
    assert_eq!(RoomRef::parse(""), None);
}

#[test]
fn display_round_trips() {
    for raw in ["server:3:channel:5", "dm:7"] {
        let parsed = RoomRef::parse(raw).unwrap();
        assert_eq!(parsed.to_string(), raw);
        assert_eq!(RoomRef::parse(&parsed.to_string()), Some(parsed));
    }
}
