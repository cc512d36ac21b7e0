use std::time::Duration;

use evacsim_core::{CellCoord, Frame, SimulationResult};
use evacsim_system_replay::ReplayEngine;

const DELAY: Duration = Duration::from_millis(500);

fn three_frame_result() -> SimulationResult {
    serde_json::from_value(serde_json::json!({
        "total_agents": 1,
        "escaped_count": 1,
        "burned_count": 0,
        "time_steps": 3,
        "exits": [[0, 5]],
        "animation_data": {"history": [
            {"fire_map": [[5, 5]], "agents": [{"pos": [2, 2], "status": "evacuating"}]},
            {"fire_map": [[5, 5], [5, 6]], "agents": [{"pos": [1, 3], "status": "evacuating"}]},
            {"fire_map": [[5, 5], [5, 6], [6, 5]], "agents": [{"pos": [1, 5], "status": "escaped"}]}
        ]}
    }))
    .expect("valid result")
}

#[test]
fn seeking_past_the_end_clamps_and_pauses() {
    let mut engine = ReplayEngine::new(&three_frame_result(), DELAY);
    engine.play();
    engine.seek(99);
    assert_eq!(engine.current_index(), 2);
    assert!(!engine.is_playing(), "seeking forces a pause");

    engine.seek(0);
    assert_eq!(engine.current_index(), 0);
}

#[test]
fn playback_stops_on_last_frame() {
    let mut engine = ReplayEngine::new(&three_frame_result(), DELAY);
    engine.play();
    assert!(engine.is_playing());

    assert!(!engine.tick(Duration::from_millis(499)));
    assert!(engine.tick(Duration::from_millis(1)));
    assert_eq!(engine.current_index(), 1);

    assert!(engine.tick(Duration::from_secs(10)));
    assert_eq!(engine.current_index(), 2);
    assert!(!engine.is_playing(), "reaching the last frame pauses");
    assert!(!engine.tick(Duration::from_secs(1)));
}

#[test]
fn play_from_last_frame_does_not_advance() {
    let mut engine = ReplayEngine::new(&three_frame_result(), DELAY);
    engine.jump_to_end();
    engine.play();
    assert!(!engine.is_playing());
    assert!(!engine.tick(Duration::from_secs(5)));
    assert_eq!(engine.current_index(), 2);
}

#[test]
fn toggle_and_reset() {
    let mut engine = ReplayEngine::new(&three_frame_result(), DELAY);
    engine.toggle();
    assert!(engine.is_playing());
    let _ = engine.tick(DELAY);
    engine.toggle();
    assert!(!engine.is_playing());
    assert_eq!(engine.current_index(), 1);
    engine.reset();
    assert_eq!(engine.current_index(), 0);
}

#[test]
fn scrubbed_frame_shows_agent_next_to_exit() {
    let mut engine = ReplayEngine::new(&three_frame_result(), DELAY);
    engine.seek(2);
    let view = engine.current_view().expect("frames present");

    assert_eq!(view.step, 2, "missing step numbers default to the index");
    assert_eq!(view.fire.len(), 3);
    assert_eq!(view.exits, &[CellCoord::from_row_col(0, 5)]);
    let agent = view.agents[0].pos;
    assert!(
        agent.manhattan_distance(CellCoord::from_row_col(0, 5)) <= 1,
        "agent at {agent:?} should be adjacent to the exit"
    );
}

#[test]
fn frame_exits_take_precedence_over_result_exits() {
    let mut result = three_frame_result();
    if let Some(data) = result.animation_data.as_mut() {
        data.history[0].exits = Some(vec![CellCoord::new(9, 9)]);
    }
    let engine = ReplayEngine::new(&result, DELAY);
    let view = engine.current_view().expect("frames present");
    assert_eq!(view.exits, &[CellCoord::new(9, 9)]);
}

#[test]
fn empty_history_is_inert() {
    let mut engine = ReplayEngine::from_frames(Vec::<Frame>::new(), DELAY);
    engine.play();
    engine.seek(4);
    engine.jump_to_end();
    assert!(!engine.is_playing());
    assert_eq!(engine.current_index(), 0);
    assert!(!engine.tick(Duration::from_secs(1)));
    assert!(engine.current_view().is_none());
}
