use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use transcript_relay::core::connection::ConnectionId;
use transcript_relay::core::room::{Departure, RandomRoomIds, RoomIdGenerator, RoomRegistry};
use transcript_relay::error::RelayError;

fn id(s: &str) -> ConnectionId {
    ConnectionId::from(s)
}

#[test]
fn test_create_room() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();

    assert_eq!(room_id.len(), 6);
    assert!(registry.contains_room(&room_id));
    assert_eq!(registry.members(&room_id).unwrap(), vec![id("a")]);
    assert_eq!(registry.rooms_of(&id("a")), vec![room_id]);
}

#[test]
fn test_join_returns_existing_members() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();

    let notify = registry.join_room(&room_id, &id("b")).unwrap();
    assert_eq!(notify, vec![id("a")]);

    let mut notify = registry.join_room(&room_id, &id("c")).unwrap();
    notify.sort();
    assert_eq!(notify, vec![id("a"), id("b")]);
    assert!(registry.is_member(&room_id, &id("c")));
}

#[test]
fn test_rejoin_is_silent() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();
    registry.join_room(&room_id, &id("b")).unwrap();

    assert!(registry.join_room(&room_id, &id("b")).unwrap().is_empty());
    assert_eq!(registry.members(&room_id).unwrap().len(), 2);
}

#[test]
fn test_join_unknown_room_leaves_registry_unchanged() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();

    let result = registry.join_room("zzzzzz", &id("c"));

    assert_eq!(result, Err(RelayError::RoomNotFound));
    assert_eq!(registry.room_count(), 1);
    assert_eq!(registry.members(&room_id).unwrap(), vec![id("a")]);
    assert!(registry.rooms_of(&id("c")).is_empty());
}

#[test]
fn test_leave_last_member_removes_room() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();
    registry.join_room(&room_id, &id("b")).unwrap();

    let departure = registry.leave_room(&room_id, &id("b")).unwrap();
    assert_eq!(
        departure,
        Departure {
            room_id: room_id.clone(),
            remaining: vec![id("a")],
        }
    );
    assert!(!departure.room_removed());

    let departure = registry.leave_room(&room_id, &id("a")).unwrap();
    assert!(departure.room_removed());
    assert!(!registry.contains_room(&room_id));
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn test_leave_is_noop_for_strangers() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();

    assert!(registry.leave_room(&room_id, &id("b")).is_none());
    assert!(registry.leave_room("zzzzzz", &id("a")).is_none());
    assert_eq!(registry.members(&room_id).unwrap(), vec![id("a")]);
}

#[test]
fn test_remove_connection_everywhere() {
    let mut registry = RoomRegistry::with_defaults();
    let shared = registry.create_room(&id("a")).unwrap();
    let solo = registry.create_room(&id("a")).unwrap();
    registry.join_room(&shared, &id("b")).unwrap();

    let departures = registry.remove_connection_everywhere(&id("a"));

    assert_eq!(departures.len(), 2);
    assert!(registry.contains_room(&shared));
    assert!(!registry.contains_room(&solo));
    assert_eq!(registry.members(&shared).unwrap(), vec![id("b")]);
    assert!(registry.rooms_of(&id("a")).is_empty());
}

#[test]
fn test_remove_connection_everywhere_is_idempotent() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();
    registry.join_room(&room_id, &id("b")).unwrap();

    assert_eq!(registry.remove_connection_everywhere(&id("b")).len(), 1);
    let rooms_after_once = registry.room_count();
    let members_after_once = registry.members(&room_id).unwrap();

    assert!(registry.remove_connection_everywhere(&id("b")).is_empty());
    assert_eq!(registry.room_count(), rooms_after_once);
    assert_eq!(registry.members(&room_id).unwrap(), members_after_once);
}

#[test]
fn test_room_ids_distinct_over_many_creates() {
    let mut registry = RoomRegistry::with_defaults();
    let mut seen = HashSet::new();

    for i in 0..10_000 {
        let room_id = registry.create_room(&id(&format!("user{}", i))).unwrap();
        assert!(seen.insert(room_id), "duplicate room id at create #{}", i);
    }
    assert_eq!(registry.room_count(), 10_000);
}

#[test]
fn test_id_exhaustion_is_internal_failure() {
    let mut registry = RoomRegistry::new(Box::new(|| "abc123".to_string()), 5);
    assert_eq!(registry.create_room(&id("a")).unwrap(), "abc123");

    let err = registry.create_room(&id("b")).unwrap_err();
    assert!(matches!(err, RelayError::InternalFailure(_)));
    assert_eq!(registry.room_count(), 1);
    assert!(registry.rooms_of(&id("b")).is_empty());
}

#[test]
fn test_reserved_id_registers_nothing_until_inserted() {
    let mut registry = RoomRegistry::new(Box::new(|| "abc123".to_string()), 3);

    let room_id = registry.reserve_id().unwrap();
    assert_eq!(registry.room_count(), 0);
    assert!(!registry.contains_room(&room_id));

    assert_eq!(registry.insert_room(room_id, &id("a")), "abc123");
    assert!(registry.is_member("abc123", &id("a")));
    assert!(registry.reserve_id().is_err());
}

#[test]
fn test_custom_id_length() {
    let mut ids = RandomRoomIds::new(12);
    assert_eq!(ids.next_id().len(), 12);
}

#[test]
fn test_dispose_resets_registry() {
    let mut registry = RoomRegistry::with_defaults();
    let room_id = registry.create_room(&id("a")).unwrap();
    registry.join_room(&room_id, &id("b")).unwrap();

    registry.dispose();
    assert_eq!(registry.room_count(), 0);
    assert!(registry.rooms_of(&id("a")).is_empty());

    // Still usable afterwards
    assert!(registry.create_room(&id("a")).is_ok());
}

#[test]
fn test_no_empty_rooms_under_random_operations() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut registry = RoomRegistry::with_defaults();
    let users: Vec<ConnectionId> = (0..8).map(|i| id(&format!("user{}", i))).collect();
    let mut known_rooms: Vec<String> = Vec::new();

    for _ in 0..5_000 {
        let user = &users[rng.gen_range(0..users.len())];
        let pick_room = |rng: &mut StdRng, rooms: &Vec<String>| {
            if rooms.is_empty() || rng.gen_bool(0.1) {
                "zzzzzz".to_string()
            } else {
                rooms[rng.gen_range(0..rooms.len())].clone()
            }
        };

        match rng.gen_range(0..4) {
            0 => known_rooms.push(registry.create_room(user).unwrap()),
            1 => {
                let room_id = pick_room(&mut rng, &known_rooms);
                let _ = registry.join_room(&room_id, user);
            }
            2 => {
                let room_id = pick_room(&mut rng, &known_rooms);
                registry.leave_room(&room_id, user);
            }
            _ => {
                registry.remove_connection_everywhere(user);
            }
        }

        for room_id in &known_rooms {
            if let Ok(members) = registry.members(room_id) {
                assert!(!members.is_empty(), "room {} registered while empty", room_id);
                for member in &members {
                    assert!(registry.rooms_of(member).contains(room_id));
                }
            }
        }
        for user in &users {
            for room_id in registry.rooms_of(user) {
                assert!(registry.is_member(&room_id, user));
            }
        }
    }
}
