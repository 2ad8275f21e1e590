use chrono::Utc;
use croquettes_shop::{
    models::Notification,
    realtime::{Hub, RealtimeEvent, notification_group, order_group},
};
use uuid::Uuid;

#[tokio::test]
async fn subscribers_receive_chat_frames() {
    let hub = Hub::new(8);
    let group = order_group(Uuid::new_v4());
    let mut rx = hub.subscribe(&group);

    let delivered = hub.publish(
        &group,
        &RealtimeEvent::ChatMessage {
            message: "Livraison demain matin ?".into(),
            sender: "awa".into(),
            created_at: Utc::now(),
        },
    );
    assert_eq!(delivered, 1);

    let frame: serde_json::Value =
        serde_json::from_str(&rx.recv().await.expect("frame")).expect("json");
    assert_eq!(frame["type"], "chat.message");
    assert_eq!(frame["message"], "Livraison demain matin ?");
    assert_eq!(frame["sender"], "awa");
}

#[tokio::test]
async fn notifications_go_to_the_recipient_group() {
    let hub = Hub::default();
    let recipient = Uuid::new_v4();
    let mut mine = hub.subscribe(&notification_group(recipient));
    let mut other = hub.subscribe(&notification_group(Uuid::new_v4()));

    let notification = Notification {
        id: Uuid::new_v4(),
        recipient_id: recipient,
        verb: "New order #CMD-20250101-abcdef12".into(),
        url: "/admin/orders/1".into(),
        unread: true,
        created_at: Utc::now(),
    };
    assert_eq!(hub.push_notification(&notification), 1);

    let frame: serde_json::Value =
        serde_json::from_str(&mine.recv().await.expect("frame")).expect("json");
    assert_eq!(frame["type"], "notify");
    assert_eq!(frame["payload"]["verb"], notification.verb);
    assert_eq!(frame["payload"]["url"], notification.url);
    assert!(other.try_recv().is_err());
}

#[test]
fn publishing_without_listeners_is_a_no_op() {
    let hub = Hub::new(4);
    let sent = hub.publish(
        "order_nobody",
        &RealtimeEvent::ChatMessage {
            message: "hello".into(),
            sender: "staff".into(),
            created_at: Utc::now(),
        },
    );
    assert_eq!(sent, 0);
    assert_eq!(hub.group_count(), 0);
}

#[test]
fn abandoned_groups_are_forgotten() {
    let hub = Hub::new(4);
    let group = order_group(Uuid::new_v4());
    drop(hub.subscribe(&group));
    assert_eq!(hub.group_count(), 1);

    let sent = hub.publish(
        &group,
        &RealtimeEvent::ChatMessage {
            message: "anyone?".into(),
            sender: "staff".into(),
            created_at: Utc::now(),
        },
    );
    assert_eq!(sent, 0);
    assert_eq!(hub.group_count(), 0);
}

#[test]
fn closed_sockets_release_their_group() {
    let hub = Hub::new(4);
    let group = order_group(Uuid::new_v4());

    let first = hub.subscribe(&group);
    let second = hub.subscribe(&group);
    assert_eq!(hub.group_count(), 1);

    drop(first);
    assert!(!hub.release(&group));
    assert_eq!(hub.group_count(), 1);

    drop(second);
    assert!(hub.release(&group));
    assert_eq!(hub.group_count(), 0);
    assert!(!hub.release(&group));
}
