//! Simple example demonstrating the tag exchange API

use etiket::{Command, OpenFlags, Permission, TagKey, TagService, Uid};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    let service = Arc::new(TagService::new());

    // Create a shared tag under key 7
    let tag = service
        .client(Uid(1000))
        .open(TagKey::Key(7), OpenFlags::CREATE, Permission::Everyone)
        .expect("open tag");
    println!("Tag opened with descriptor {}", tag);

    // Receivers wait on levels 0, 1 and 2
    let mut listeners = vec![];
    for level in 0..3usize {
        let service = service.clone();
        listeners.push(thread::spawn(move || {
            let client = service.client(Uid(2000 + level as u32));
            let mut buf = [0u8; 64];
            match client.recv(tag, level, &mut buf) {
                Ok(0) => println!("Level {}: woken by awake-all", level),
                Ok(n) => println!(
                    "Level {}: received {:?}",
                    level,
                    String::from_utf8_lossy(&buf[..n])
                ),
                Err(err) => println!("Level {}: failed with {}", level, err),
            }
        }));
    }

    // Wait until all three receivers are standing
    while service
        .snapshot()
        .iter()
        .find(|stat| stat.descriptor == tag)
        .map_or(0, |stat| stat.readers.iter().sum())
        < 3
    {
        thread::yield_now();
    }
    println!("Census before delivery:\n{}", service.report());

    // Deliver to level 0; the send returns once the copy-out is done
    let sender = service.client(Uid(1000));
    sender.send(tag, 0, b"hello level zero").expect("send");
    println!("Message delivered to level 0");

    // Give the remaining receivers a moment, then flush them all
    thread::sleep(Duration::from_millis(50));
    sender.ctl(tag, Command::AwakeAll).expect("awake-all");
    println!("Awake-all issued");

    for listener in listeners {
        listener.join().expect("listener panicked");
    }

    // Tear the tag down; its key becomes free again
    sender.ctl(tag, Command::Remove).expect("remove");
    println!("Tag removed");

    println!("Example completed successfully!");
}
