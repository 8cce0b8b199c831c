use etiket::{Command, OpenFlags, Permission, TagError, TagKey, TagService, Uid};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn wait_for_readers(service: &TagService, tag: usize, level: usize, want: usize) {
    while service
        .snapshot()
        .iter()
        .find(|stat| stat.descriptor == tag)
        .map_or(0, |stat| stat.readers[level])
        < want
    {
        thread::yield_now();
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_message_reaches_every_standing_receiver() {
    let service = Arc::new(TagService::new());
    let tag = service
        .client(Uid(1))
        .open(TagKey::Private, OpenFlags::empty(), Permission::Everyone)
        .unwrap();

    let mut handles = vec![];
    for _ in 0..3 {
        let service = service.clone();
        handles.push(thread::spawn(move || {
            let client = service.client(Uid(2));
            let mut buf = [0u8; 32];
            let n = client.recv(tag, 4, &mut buf).unwrap();
            assert_eq!(&buf[..n], b"fan-out");
        }));
    }

    wait_for_readers(&service, tag, 4, 3);
    service.client(Uid(1)).send(tag, 4, b"fan-out").unwrap();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_late_receiver_misses_the_message() {
    let service = TagService::new();
    let client = service.client(Uid(1));
    let tag = client
        .open(TagKey::Private, OpenFlags::empty(), Permission::Everyone)
        .unwrap();

    // nobody standing: the send succeeds and the message is discarded
    client.send(tag, 0, b"vanishes").unwrap();

    let mut buf = [0u8; 32];
    assert_eq!(
        client.recv_timeout(tag, 0, &mut buf, Duration::from_millis(100)),
        Err(TagError::Interrupted)
    );
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_short_buffer_fails_without_consuming() {
    let service = Arc::new(TagService::new());
    let tag = service
        .client(Uid(1))
        .open(TagKey::Private, OpenFlags::empty(), Permission::Everyone)
        .unwrap();

    let cramped = {
        let service = service.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 2];
            service.client(Uid(2)).recv(tag, 0, &mut buf)
        })
    };
    let roomy = {
        let service = service.clone();
        thread::spawn(move || -> etiket::Result<Vec<u8>> {
            let mut buf = [0u8; 32];
            let n = service.client(Uid(3)).recv(tag, 0, &mut buf)?;
            Ok(buf[..n].to_vec())
        })
    };

    wait_for_readers(&service, tag, 0, 2);
    service.client(Uid(1)).send(tag, 0, b"eight by").unwrap();

    assert_eq!(cramped.join().unwrap(), Err(TagError::NoBufferSpace));
    assert_eq!(roomy.join().unwrap(), Ok(b"eight by".to_vec()));
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_levels_do_not_cross_talk() {
    let service = Arc::new(TagService::new());
    let tag = service
        .client(Uid(1))
        .open(TagKey::Private, OpenFlags::empty(), Permission::Everyone)
        .unwrap();

    let listener = {
        let service = service.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 8];
            service.client(Uid(2)).recv(tag, 3, &mut buf).unwrap()
        })
    };

    wait_for_readers(&service, tag, 3, 1);
    // traffic on another level leaves the level-3 receiver standing
    service.client(Uid(1)).send(tag, 5, b"elsewhere").unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(
        service
            .snapshot()
            .iter()
            .find(|stat| stat.descriptor == tag)
            .map(|stat| stat.readers[3]),
        Some(1)
    );

    service.client(Uid(1)).send(tag, 3, b"here").unwrap();
    assert_eq!(listener.join().unwrap(), 4);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_zero_length_send_wakes_no_one() {
    let service = Arc::new(TagService::new());
    let tag = service
        .client(Uid(1))
        .open(TagKey::Private, OpenFlags::empty(), Permission::Everyone)
        .unwrap();

    let listener = {
        let service = service.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 8];
            service.client(Uid(2)).recv(tag, 0, &mut buf).unwrap()
        })
    };

    wait_for_readers(&service, tag, 0, 1);
    service.client(Uid(1)).send(tag, 0, b"").unwrap();
    thread::sleep(Duration::from_millis(50));
    // the receiver never noticed
    assert_eq!(
        service
            .snapshot()
            .iter()
            .find(|stat| stat.descriptor == tag)
            .map(|stat| stat.readers[0]),
        Some(1)
    );

    service.client(Uid(1)).ctl(tag, Command::AwakeAll).unwrap();
    assert_eq!(listener.join().unwrap(), 0);
}
