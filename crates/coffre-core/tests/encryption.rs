//! Buffer encryption tests: roundtrips, sharing at encryption time and
//! after the fact, self-exclusion, and resource ID inspection.

use coffre_core::{EncryptionOptions, Error, SIMPLE_OVERHEAD, resource_id};
use coffre_harness::TestApp;

#[test]
fn encrypt_decrypt_roundtrip() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let encrypted = session.encrypt(b"attack at dawn", None).expect("encrypt should succeed");
    let decrypted = session.decrypt(&encrypted).expect("author should decrypt");
    assert_eq!(decrypted, b"attack at dawn");
}

#[test]
fn empty_plaintext_is_legal() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let encrypted = session.encrypt(b"", None).expect("encrypt should succeed");
    assert_eq!(encrypted.len(), SIMPLE_OVERHEAD);
    assert_eq!(session.decrypt(&encrypted).expect("decrypt should succeed"), b"");
}

#[test]
fn overhead_is_constant() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    for len in [1usize, 17, 1024, 70_000] {
        let clear = vec![0xA5u8; len];
        let encrypted = session.encrypt(&clear, None).expect("encrypt should succeed");
        assert_eq!(encrypted.len(), len + SIMPLE_OVERHEAD);
    }
}

#[test]
fn every_encryption_gets_a_fresh_resource() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let first = session.encrypt(b"same bytes", None).expect("encrypt should succeed");
    let second = session.encrypt(b"same bytes", None).expect("encrypt should succeed");
    assert_ne!(first, second);
    assert_ne!(
        resource_id(&first).expect("well-formed header"),
        resource_id(&second).expect("well-formed header")
    );
}

#[test]
fn sharing_at_encryption_time() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        ..EncryptionOptions::default()
    };
    let encrypted =
        alice_session.encrypt(b"for bob too", Some(&options)).expect("encrypt should succeed");

    assert_eq!(bob_session.decrypt(&encrypted).expect("bob should decrypt"), b"for bob too");
}

#[test]
fn unshared_data_stays_private() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let encrypted = alice_session.encrypt(b"private", None).expect("encrypt should succeed");
    let err = bob_session.decrypt(&encrypted).expect_err("bob holds no grant");
    assert!(matches!(err, Error::DecryptionFailed(_)));
}

#[test]
fn sharing_after_encryption() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let encrypted = alice_session.encrypt(b"late share", None).expect("encrypt should succeed");
    let id = alice_session.get_resource_id(&encrypted).expect("header should parse");

    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        ..EncryptionOptions::default()
    };
    alice_session.share(&[id], &options).expect("share should succeed");

    assert_eq!(bob_session.decrypt(&encrypted).expect("bob should decrypt"), b"late share");
}

#[test]
fn share_rejects_an_empty_resource_list() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        ..EncryptionOptions::default()
    };
    assert!(matches!(session.share(&[], &options), Err(Error::InvalidArgument(_))));
}

#[test]
fn share_without_access_is_rejected() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let encrypted = alice_session.encrypt(b"not yours", None).expect("encrypt should succeed");
    let id = alice_session.get_resource_id(&encrypted).expect("header should parse");

    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        ..EncryptionOptions::default()
    };
    let err = bob_session.share(&[id], &options).expect_err("bob holds no key to share");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn self_exclusion_denies_the_author_but_not_recipients() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        share_with_self: false,
        ..EncryptionOptions::default()
    };
    let encrypted =
        alice_session.encrypt(b"bob only", Some(&options)).expect("encrypt should succeed");

    // The author's denial was recorded deliberately, so this is an argument
    // error rather than a missing-key error
    let err = alice_session.decrypt(&encrypted).expect_err("alice denied herself the key");
    assert!(matches!(err, Error::InvalidArgument(_)));

    assert_eq!(bob_session.decrypt(&encrypted).expect("bob should decrypt"), b"bob only");
}

#[test]
fn invalid_recipient_means_no_ciphertext() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let ghost = app.create_identity("ghost-who-never-registered");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let options = EncryptionOptions {
        share_with_users: vec![ghost.to_public()],
        ..EncryptionOptions::default()
    };
    let err = session.encrypt(b"data", Some(&options)).expect_err("unknown recipient");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn resource_id_is_pure_header_inspection() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let encrypted = session.encrypt(b"data", None).expect("encrypt should succeed");
    let id = session.get_resource_id(&encrypted).expect("header should parse");
    assert_eq!(id, resource_id(&encrypted).expect("free function agrees"));

    // No backend call and no particular status is needed
    let stopped =
        coffre_core::Session::new(app.session_config(), app.client()).expect("valid config");
    assert_eq!(stopped.get_resource_id(&encrypted).expect("works while Stopped"), id);
}

#[test]
fn too_short_input_is_an_argument_error() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    assert!(matches!(session.decrypt(&[]), Err(Error::InvalidArgument(_))));
    assert!(matches!(session.decrypt(&[0x01, 0x02]), Err(Error::InvalidArgument(_))));
    assert!(matches!(session.get_resource_id(&[0x01]), Err(Error::InvalidArgument(_))));
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let session = app.open_ready_session(&alice).expect("session should reach Ready");

    let mut encrypted = session.encrypt(b"integrity", None).expect("encrypt should succeed");
    let last = encrypted.len() - 1;
    encrypted[last] ^= 0x01;

    let err = session.decrypt(&encrypted).expect_err("tampered data must not decrypt");
    assert!(matches!(err, Error::DecryptionFailed(_)));
}

#[test]
fn encryption_session_reuses_one_resource() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let encryptor =
        alice_session.encryption_session(None).expect("encryption session should open");
    let first = encryptor.encrypt(b"one").expect("encrypt should succeed");
    let second = encryptor.encrypt(b"two").expect("encrypt should succeed");

    let id = encryptor.resource_id();
    assert_eq!(alice_session.get_resource_id(&first).expect("header"), id);
    assert_eq!(alice_session.get_resource_id(&second).expect("header"), id);

    // One share covers every output
    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        ..EncryptionOptions::default()
    };
    alice_session.share(&[id], &options).expect("share should succeed");
    assert_eq!(bob_session.decrypt(&first).expect("bob should decrypt"), b"one");
    assert_eq!(bob_session.decrypt(&second).expect("bob should decrypt"), b"two");
}

#[test]
fn encryption_session_binds_recipients_up_front() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let bob = app.create_identity("bob");
    let alice_session = app.open_ready_session(&alice).expect("alice should reach Ready");
    let bob_session = app.open_ready_session(&bob).expect("bob should reach Ready");

    let options = EncryptionOptions {
        share_with_users: vec![bob.to_public()],
        ..EncryptionOptions::default()
    };
    let encryptor = alice_session
        .encryption_session(Some(&options))
        .expect("encryption session should open");

    let encrypted = encryptor.encrypt(b"bound at creation").expect("encrypt should succeed");
    assert_eq!(
        bob_session.decrypt(&encrypted).expect("bob should decrypt"),
        b"bound at creation"
    );
}

#[test]
fn encryption_session_dies_with_its_parent() {
    let app = TestApp::new();
    let alice = app.create_identity("alice");
    let mut session = app.open_ready_session(&alice).expect("session should reach Ready");

    let encryptor = session.encryption_session(None).expect("encryption session should open");
    encryptor.encrypt(b"while ready").expect("encrypt should work while the parent is Ready");

    session.stop().expect("stop should succeed");
    let err = encryptor.encrypt(b"after stop").expect_err("the parent is stopped");
    assert!(matches!(err, Error::PreconditionFailed(_)));
    assert!(matches!(
        encryptor.stream_encrypt(std::io::empty()),
        Err(Error::PreconditionFailed(_))
    ));

    // Restarting the parent does not revive encryptors from the old run
    session.start(&alice.to_token()).expect("restart should succeed");
    assert!(matches!(encryptor.encrypt(b"new run"), Err(Error::PreconditionFailed(_))));
}
