//! End-to-end playback behavior against the offline backend.

use hushtone_engine::catalog::{self, SoundDefinition};
use hushtone_engine::graph::GraphId;
use hushtone_engine::{
    ContextState, EngineConfig, EngineError, GraphEvent, OfflineBackend, OfflineTap, PlaybackState, SoundEngine,
};

const SR: u32 = 48_000;

fn offline(backend: OfflineBackend) -> (SoundEngine, OfflineTap) {
    let tap = backend.tap();
    let config = EngineConfig { seed: Some(42), ..EngineConfig::default() };
    (SoundEngine::new(config, Box::new(backend)).unwrap(), tap)
}

fn engine() -> (SoundEngine, OfflineTap) {
    offline(OfflineBackend::new(SR, 1))
}

fn sound(id: &str) -> &'static SoundDefinition {
    catalog::lookup(id).unwrap()
}

fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn at_most_one_graph_is_ever_connected() {
    let (mut e, tap) = engine();
    let plays: [(&str, bool); 6] =
        [("ocean", true), ("gentle", false), ("rain", true), ("classic", false), ("cafe", true), ("forest", true)];
    for (id, ambient) in plays {
        if ambient {
            e.play_ambient(sound(id), true, None).unwrap();
        } else {
            e.play_alarm_tone(sound(id), None).unwrap();
        }
        assert_eq!(e.active_graph_count(), 1);
        tap.render(64);
        assert_eq!(e.connected_graph_count(), 1);
        assert_eq!(e.active_graph_count(), 1);
    }
}

#[test]
fn stop_when_idle_is_a_no_op() {
    let (mut e, tap) = engine();
    e.stop();
    e.stop();
    assert_eq!(e.state(), PlaybackState::Idle);
    assert_eq!(e.context_state(), ContextState::Uninitialized);
    tap.render(128);
    assert!(e.take_events().is_empty());
}

#[test]
fn double_stop_is_harmless() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("rain"), true, None).unwrap();
    tap.render(128);
    e.stop();
    e.stop();
    tap.render(128);
    assert_eq!(e.state(), PlaybackState::Idle);
    assert_eq!(e.connected_graph_count(), 0);
    let stopped = e.take_events().iter().filter(|ev| matches!(ev, GraphEvent::Stopped { .. })).count();
    assert_eq!(stopped, 1);
}

#[test]
fn stop_after_natural_end_is_a_no_op() {
    let (mut e, tap) = engine();
    e.play_alarm_tone(sound("chime"), Some(10)).unwrap();
    // Render past the end without polling, then stop: the renderer has already retired it.
    tap.render(1_000);
    assert_eq!(e.connected_graph_count(), 0);
    e.stop();
    tap.render(128);
    assert_eq!(e.state(), PlaybackState::Idle);
    let events = e.take_events();
    assert!(events.iter().any(|ev| matches!(ev, GraphEvent::Ended { id: GraphId(1), frame: 480 })), "{events:?}");
}

#[test]
fn bounded_ambient_ends_exactly_at_its_duration() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("ocean"), true, Some(2_000)).unwrap();
    assert!(!e.is_looping());

    tap.render(95_999);
    assert!(e.is_playing(), "ended early");
    tap.render(1);
    assert!(!e.is_playing(), "did not end on the boundary");
    assert_eq!(e.state(), PlaybackState::Idle);

    let ended = e.take_events().into_iter().find_map(|ev| match ev {
        GraphEvent::Ended { frame, .. } => Some(frame),
        _ => None,
    });
    assert_eq!(ended, Some(96_000));
}

#[test]
fn longest_duration_ambient_plays_past_its_buffer() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("rain"), false, Some(u32::MAX)).unwrap();
    assert!(!e.is_looping());
    tap.render(5 * SR as usize);
    assert!(e.is_playing());
    assert!(peak(&tap.render_ms(100)) > 0.0);
    e.stop();
    assert_eq!(e.state(), PlaybackState::Idle);
}

#[test]
fn longest_duration_alarm_is_accepted() {
    let (mut e, tap) = engine();
    e.play_alarm_tone(sound("gentle"), Some(u32::MAX)).unwrap();
    tap.render(SR as usize);
    assert!(e.is_playing());
}

#[test]
fn one_shot_ambient_plays_its_buffer_once() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("white-noise"), false, None).unwrap();
    tap.render(2 * SR as usize - 1);
    assert!(e.is_playing());
    tap.render(1);
    assert!(!e.is_playing());
}

#[test]
fn looped_ambient_outlives_its_buffer() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("rain"), true, None).unwrap();
    tap.render(5 * SR as usize);
    assert!(e.is_playing());
    assert!(e.is_looping());
    // Still producing sound well past the 2 s buffer.
    assert!(peak(&tap.render_ms(100)) > 0.0);
}

#[test]
fn alarm_fades_in_linearly_to_its_gain() {
    let (mut e, tap) = engine();
    e.play_alarm_tone(sound("classic"), None).unwrap();
    let head = tap.render_ms(100);
    // 880 Hz completes a cycle every ~55 frames; look at whole cycles.
    let first = peak(&head[..240]);
    let middle = peak(&head[2_280..2_520]);
    assert!(first < 0.02, "first={first}");
    assert!((middle - 0.15).abs() < 0.01, "middle={middle}");
    let held = peak(&tap.render_ms(50));
    assert!((held - 0.3).abs() < 0.005, "held={held}");
}

#[test]
fn bounded_alarm_fades_out_and_stops() {
    let (mut e, tap) = engine();
    e.play_alarm_tone(sound("digital"), Some(1_000)).unwrap();
    let out = tap.render_ms(1_000);
    let tail = peak(&out[out.len() - 48..]);
    assert!(tail < 0.01, "tail={tail}");
    assert!(!e.is_playing());
    assert!(peak(&tap.render_ms(10)) == 0.0);
}

#[test]
fn unknown_texture_kind_plays_white_noise() {
    let (mut e, tap) = engine();
    let mystery = SoundDefinition::texture("mystery", "Mystery", "nonexistent");
    e.play_ambient(&mystery, true, None).unwrap();
    assert!(matches!(e.state(), PlaybackState::Playing { ref sound, .. } if sound == "mystery"));
    let out = tap.render(SR as usize);
    let p = peak(&out);
    // White noise ×0.1 through gain 0.1, unfiltered.
    assert!(p > 0.005 && p <= 0.01 + 1e-6, "peak={p}");
}

#[test]
fn previous_graph_stops_before_the_next_starts() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("forest"), true, None).unwrap();
    tap.render(256);
    e.play_alarm_tone(sound("bright"), Some(3_000)).unwrap();
    tap.render(256);

    let events = e.take_events();
    let stopped_a = events.iter().position(|ev| matches!(ev, GraphEvent::Stopped { id: GraphId(1), .. }));
    let started_b = events.iter().position(|ev| matches!(ev, GraphEvent::Started { id: GraphId(2), .. }));
    assert!(stopped_a.is_some() && started_b.is_some(), "{events:?}");
    assert!(stopped_a < started_b);

    // Same block boundary: no frame where both sounded.
    let frame_of = |pos: Option<usize>| match pos.map(|i| &events[i]) {
        Some(GraphEvent::Stopped { frame, .. } | GraphEvent::Started { frame, .. }) => *frame,
        _ => unreachable!(),
    };
    assert_eq!(frame_of(stopped_a), frame_of(started_b));
}

#[test]
fn unavailable_context_connects_nothing() {
    let (mut e, tap) = offline(OfflineBackend::new(SR, 2).failing("audio denied by host"));
    let err = e.play_ambient(sound("ocean"), true, None).unwrap_err();
    assert!(matches!(err, EngineError::ContextUnavailable { .. }), "{err}");
    let err = e.play_alarm_tone(sound("gentle"), None).unwrap_err();
    assert!(matches!(err, EngineError::ContextUnavailable { .. }));
    assert_eq!(e.state(), PlaybackState::Idle);
    assert_eq!(e.active_graph_count(), 0);
    assert!(!e.is_looping());
    assert!(!tap.is_attached());
    assert!(e.take_events().is_empty());
}

#[test]
fn suspended_context_resumes_on_play() {
    let (mut e, tap) = engine();
    e.play_ambient(sound("cafe"), true, None).unwrap();
    tap.render(128);
    e.suspend_context().unwrap();
    assert_eq!(e.context_state(), ContextState::Suspended);
    let frames = e.frames_rendered();
    assert!(tap.render(1_000).iter().all(|s| *s == 0.0));
    assert_eq!(e.frames_rendered(), frames);

    e.play_alarm_tone(sound("gentle"), None).unwrap();
    assert_eq!(e.context_state(), ContextState::Running);
    tap.render(128);
    assert_eq!(e.frames_rendered(), frames + 128);
}

#[test]
fn host_suspended_context_starts_running() {
    let (mut e, tap) = offline(OfflineBackend::new(SR, 2).starting_suspended());
    e.play_alarm_tone(sound("gentle"), None).unwrap();
    assert_eq!(e.context_state(), ContextState::Running);
    assert_eq!(e.sample_rate(), Some(SR));
    assert_eq!(tap.render(128).len(), 256);
    assert_eq!(e.frames_rendered(), 128);
}

#[test]
fn seeded_engines_render_identical_textures() {
    let (mut a, tap_a) = engine();
    let (mut b, tap_b) = engine();
    a.play_ambient(sound("forest"), true, None).unwrap();
    b.play_ambient(sound("forest"), true, None).unwrap();
    assert_eq!(tap_a.render(4_800), tap_b.render(4_800));
}
