//! Futures and streams over the typed service.

use typedtree::{
    CollectionPath, DecodeResult, EventKind, MemoryDatabase, Reference, Service, TypedPath, Value,
};

fn visits() -> TypedPath<i64> {
    TypedPath::parse("counters/visits").unwrap()
}

#[tokio::test]
async fn value_once_resolves_with_current_value() {
    let db = MemoryDatabase::new();
    let service = Service::new(db.reference());
    service.set_value(&visits(), &42).unwrap();

    assert_eq!(service.value_once(&visits()).await, DecodeResult::Ok(42));
}

#[tokio::test]
async fn value_stream_yields_each_change() {
    let db = MemoryDatabase::new();
    let service = Service::new(db.reference());
    service.set_value(&visits(), &1).unwrap();

    let mut stream = service.value_stream(&visits());
    service.set_value(&visits(), &2).unwrap();
    db.reference()
        .child("counters/visits")
        .set_value(Value::from("bad"))
        .unwrap();
    service.set_value(&visits(), &3).unwrap();

    assert_eq!(stream.next().await, Some(DecodeResult::Ok(1)));
    assert_eq!(stream.next().await, Some(DecodeResult::Ok(2)));
    assert!(stream.next().await.map_or(false, |r| r.is_failed()));
    assert_eq!(stream.next().await, Some(DecodeResult::Ok(3)));
    assert!(stream.try_next().is_none());
}

#[tokio::test]
async fn collection_stream_and_once() {
    let db = MemoryDatabase::new();
    let service = Service::new(db.reference());
    let messages: CollectionPath<String> = CollectionPath::parse("messages").unwrap();

    let mut added = service.collection_stream(EventKind::ChildAdded, &messages);
    service.add_value(&messages, &"one".to_string()).unwrap();
    service.add_value(&messages, &"two".to_string()).unwrap();

    assert_eq!(added.next().await, Some(DecodeResult::Ok("one".to_string())));
    assert_eq!(added.next().await, Some(DecodeResult::Ok("two".to_string())));

    let first = service.collection_once(EventKind::ChildAdded, &messages).await;
    assert_eq!(first, DecodeResult::Ok("one".to_string()));
}

#[tokio::test]
async fn dropping_a_stream_removes_its_observer() {
    let db = MemoryDatabase::new();
    let service = Service::new(db.reference());

    let mut stream = service.value_stream(&visits());
    assert!(stream.handle().is_some());
    assert_eq!(db.observer_count(), 1);

    stream.cancel();
    assert!(stream.handle().is_none());
    assert_eq!(db.observer_count(), 0);

    {
        let _other = service.value_stream(&visits());
        assert_eq!(db.observer_count(), 1);
    }
    assert_eq!(db.observer_count(), 0);
}

#[tokio::test]
async fn stream_ends_after_cancel_is_drained() {
    let db = MemoryDatabase::new();
    let service = Service::new(db.reference());

    let mut stream = service.value_stream(&visits());
    stream.cancel();
    service.set_value(&visits(), &5).unwrap();

    // Only the delivery made at registration was queued.
    assert!(stream.next().await.map_or(false, |r| r.is_failed()));
    assert_eq!(stream.next().await, None);
}
