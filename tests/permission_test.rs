use etiket::{Command, OpenFlags, Permission, TagError, TagKey, TagService, Uid};
use std::sync::Arc;
use std::thread;

#[test]
fn test_restricted_tag_rejects_strangers() {
    let service = TagService::new();
    let owner = service.client(Uid(1000));
    let stranger = service.client(Uid(1001));

    let tag = owner
        .open(TagKey::Key(2), OpenFlags::CREATE, Permission::OwnerOnly)
        .unwrap();

    let mut buf = [0u8; 8];
    assert_eq!(stranger.send(tag, 0, b"x"), Err(TagError::PermissionDenied));
    assert_eq!(
        stranger.recv(tag, 0, &mut buf),
        Err(TagError::PermissionDenied)
    );
    assert_eq!(
        stranger.ctl(tag, Command::AwakeAll),
        Err(TagError::PermissionDenied)
    );
    assert_eq!(
        stranger.ctl(tag, Command::Remove),
        Err(TagError::PermissionDenied)
    );

    // the owner is unaffected
    owner.send(tag, 0, b"x").unwrap();
    owner.ctl(tag, Command::AwakeAll).unwrap();
}

#[test]
fn test_lookup_is_not_permission_gated() {
    let service = TagService::new();
    let owner = service.client(Uid(1));
    let stranger = service.client(Uid(2));

    let tag = owner
        .open(TagKey::Key(4), OpenFlags::CREATE, Permission::OwnerOnly)
        .unwrap();

    // resolving the key works for anyone; using the tag does not
    let looked_up = stranger
        .open(TagKey::Key(4), OpenFlags::CREATE, Permission::Everyone)
        .unwrap();
    assert_eq!(looked_up, tag);
    assert_eq!(
        stranger.send(looked_up, 0, b"x"),
        Err(TagError::PermissionDenied)
    );
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_open_tag_serves_any_uid() {
    let service = Arc::new(TagService::new());
    let tag = service
        .client(Uid(1))
        .open(TagKey::Key(6), OpenFlags::CREATE, Permission::Everyone)
        .unwrap();

    let listener = {
        let service = service.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 16];
            let n = service.client(Uid(3)).recv(tag, 9, &mut buf).unwrap();
            buf[..n].to_vec()
        })
    };

    while service
        .snapshot()
        .iter()
        .find(|stat| stat.descriptor == tag)
        .map_or(0, |stat| stat.readers[9])
        < 1
    {
        thread::yield_now();
    }
    service.client(Uid(2)).send(tag, 9, b"anyone").unwrap();
    assert_eq!(listener.join().unwrap(), b"anyone".to_vec());
}
