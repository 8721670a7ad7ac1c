//! The audio-thread side of a playback session.

use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tp_engine::{Command, Engine, Notification, Subscription};

use crate::status::PlaybackStatus;

/// Controller-side ends of the session queues.
pub(crate) struct SessionQueues {
    pub commands: HeapProd<Command>,
    pub notifications: HeapCons<Notification>,
}

/// Wire `engine` to fresh command and notification queues. Returns the
/// controller's ends and the render closure to hand to the sink.
pub(crate) fn connect(
    mut engine: Engine,
    command_capacity: usize,
    notification_capacity: usize,
    status: Arc<PlaybackStatus>,
) -> (SessionQueues, impl FnMut(&mut [f32]) + Send + 'static) {
    let (cmd_prod, mut cmd_cons) = HeapRb::<Command>::new(command_capacity.max(1)).split();
    let (mut note_prod, note_cons) = HeapRb::<Notification>::new(notification_capacity.max(1)).split();

    // Dropped when the queue is full; the controller polls too slowly
    engine.events().subscribe(Subscription::All, move |n| {
        let _ = note_prod.try_push(*n);
    });
    status.publish(&engine);

    let render = move |out: &mut [f32]| {
        while let Some(command) = cmd_cons.try_pop() {
            engine.apply(command);
        }
        engine.render_interleaved(out);
        status.publish(&engine);
    };

    let queues = SessionQueues {
        commands: cmd_prod,
        notifications: note_cons,
    };
    (queues, render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_engine::EngineConfig;
    use tp_ir::{Module, OrderEntry, Pattern};

    fn engine() -> Engine {
        let mut m = Module::with_channels("rt", 2);
        m.patterns.push(Pattern::new(4, 2));
        m.patterns.push(Pattern::new(4, 2));
        m.orders = vec![OrderEntry::Pattern(0), OrderEntry::Pattern(1)];
        Engine::with_module(m, EngineConfig { sample_rate: 1000, master_volume: 1.0 })
    }

    #[test]
    fn commands_apply_before_render() {
        let status = Arc::new(PlaybackStatus::new());
        let (mut queues, mut render) = connect(engine(), 8, 64, Arc::clone(&status));
        assert!(!status.snapshot().playing);

        queues.commands.try_push(Command::Play).unwrap();
        queues.commands.try_push(Command::NextOrder).unwrap();
        let mut block = [0.0f32; 64];
        render(&mut block[..]);

        let snap = status.snapshot();
        assert!(snap.playing);
        assert_eq!((snap.order, snap.pattern, snap.bpm, snap.speed), (1, Some(1), 125, 6));
    }

    #[test]
    fn notifications_are_forwarded() {
        let status = Arc::new(PlaybackStatus::new());
        let (mut queues, mut render) = connect(engine(), 8, 64, status);
        queues.commands.try_push(Command::Play).unwrap();
        render(&mut [0.0f32; 2][..]);

        let received: Vec<Notification> = queues.notifications.pop_iter().collect();
        assert_eq!(received[0], Notification::PlayStarted);
        assert!(received.contains(&Notification::RowChanged { row: 0, rows: 4 }));
    }

    #[test]
    fn full_notification_queue_drops() {
        let status = Arc::new(PlaybackStatus::new());
        let (mut queues, mut render) = connect(engine(), 8, 2, status);
        queues.commands.try_push(Command::Play).unwrap();
        // 4 rows at 20 frames per tick
        let mut block = vec![0.0f32; 2 * 20 * 6 * 4];
        render(&mut block[..]);
        assert_eq!(queues.notifications.pop_iter().count(), 2);
    }
}
