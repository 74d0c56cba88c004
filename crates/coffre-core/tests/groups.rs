//! Group sharing tests: creation, membership growth, and retroactive
//! access.

use coffre_core::{EncryptionOptions, Error, GroupId};
use coffre_harness::{MAX_GROUP_SIZE, TestApp};

#[test]
fn group_members_can_decrypt() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let group = alice_session
        .create_group(&[alice.to_public(), bob.to_public()])
        .expect("group creation should succeed");

    let options =
        EncryptionOptions { share_with_groups: vec![group], ..EncryptionOptions::default() };
    let encrypted =
        alice_session.encrypt(b"team update", Some(&options)).expect("encrypt should succeed");

    assert_eq!(bob_session.decrypt(&encrypted).expect("bob should decrypt"), b"team update");
}

#[test]
fn new_members_gain_retroactive_access() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let charlie = app.create_identity("charlie");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let charlie_session = app.open_ready_session(&charlie).expect("charlie should reach Ready");

    let group =
        alice_session.create_group(&[alice.to_public()]).expect("group creation should succeed");
    let options = EncryptionOptions {
        share_with_groups: vec![group.clone()],
        ..EncryptionOptions::default()
    };
    let encrypted =
        alice_session.encrypt(b"before charlie", Some(&options)).expect("encrypt should succeed");

    let err = charlie_session.decrypt(&encrypted).expect_err("charlie is not a member yet");
    assert!(matches!(err, Error::DecryptionFailed(_)));

    alice_session
        .update_group_members(&group, &[charlie.to_public()])
        .expect("adding a member should succeed");

    // Membership grants access to everything ever shared with the group
    assert_eq!(
        charlie_session.decrypt(&encrypted).expect("charlie should decrypt now"),
        b"before charlie"
    );
}

#[test]
fn empty_member_list_is_rejected_synchronously() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    assert!(matches!(session.create_group(&[]), Err(Error::InvalidArgument(_))));

    let group = session.create_group(&[alice.to_public()]).expect("group creation");
    assert!(matches!(session.update_group_members(&group, &[]), Err(Error::InvalidArgument(_))));
}

#[test]
fn invalid_member_means_no_group() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let ghost = app.create_identity("ghost-who-never-registered");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let err = session
        .create_group(&[alice.to_public(), ghost.to_public()])
        .expect_err("unknown member must fail the whole creation");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn sharing_with_an_unknown_group_fails() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let options = EncryptionOptions {
        share_with_groups: vec![GroupId::from_bytes([0x42; 16])],
        ..EncryptionOptions::default()
    };
    let err = session.encrypt(b"data", Some(&options)).expect_err("unknown group");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn updating_an_unknown_group_fails() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let err = session
        .update_group_members(&GroupId::from_bytes([0x42; 16]), &[alice.to_public()])
        .expect_err("unknown group");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn oversized_groups_are_rejected() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let members: Vec<_> = (0..=MAX_GROUP_SIZE)
        .map(|i| app.create_identity(&format!("user-{i}")).to_public())
        .collect();
    let err = session.create_group(&members).expect_err("one member over the limit");
    assert!(matches!(err, Error::GroupTooBig(_)));
}
