use std::time::Duration;

use analysis::{AnalysisRequest, AnalysisScheduler, EngineHost, SchedulerConfig};
use engine::mock::{MockScript, MockSpawner};
use engine::Score;

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
const AFTER_D4: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";
const AFTER_NF3: &str = "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1";

fn mount(mock: &MockSpawner, fen: &str) -> AnalysisScheduler {
    AnalysisScheduler::mount(
        SchedulerConfig::default(),
        EngineHost::available(mock.clone()),
        AnalysisRequest::new(fen, 10),
    )
}

/// Let every task run to quiescence. Time is paused, so the clock jumps
/// straight past any pending debounce.
async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn positions(mock: &MockSpawner) -> Vec<String> {
    mock.commands()
        .into_iter()
        .filter(|c| c.starts_with("position"))
        .collect()
}

mod first_search {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn analyzes_initial_request_on_ready() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;

        let snapshot = scheduler.snapshot();
        assert!(snapshot.is_ready);
        assert!(!snapshot.is_analyzing);
        assert_eq!(snapshot.variations.len(), 2);
        assert_eq!(snapshot.variations[0].moves, vec!["e2e4", "e7e5"]);
        assert_eq!(snapshot.variations[1].score, Score::Centipawns(20));
        assert_eq!(snapshot.best_move.as_deref(), Some("e2e4"));
        assert_eq!(snapshot.current_depth, 10);
        assert_eq!(snapshot.error, None);

        assert_eq!(
            mock.commands(),
            vec![
                "uci".to_string(),
                "setoption name MultiPV value 3".to_string(),
                "setoption name Threads value 1".to_string(),
                "setoption name Hash value 16".to_string(),
                "isready".to_string(),
                format!("position fen {}", START),
                "go depth 10".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn black_to_move_scores_are_white_relative() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, AFTER_E4);
        settle().await;

        assert_eq!(scheduler.snapshot().evaluation(), Some(Score::Centipawns(-30)));
    }

    #[tokio::test(start_paused = true)]
    async fn change_before_ready_uses_live_request() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        scheduler.set_position(AFTER_D4);
        settle().await;

        assert_eq!(positions(&mock), vec![format!("position fen {}", AFTER_D4)]);
        let goes = mock.commands().iter().filter(|c| c.starts_with("go")).count();
        assert_eq!(goes, 1);
        assert_eq!(scheduler.snapshot().evaluation(), Some(Score::Centipawns(-30)));
    }
}

mod debounce {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_coalesce_into_last() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;

        scheduler.set_position(AFTER_E4);
        scheduler.set_position(AFTER_D4);
        scheduler.set_position(AFTER_NF3);
        settle().await;

        assert_eq!(
            positions(&mock),
            vec![
                format!("position fen {}", START),
                format!("position fen {}", AFTER_NF3),
            ]
        );
        assert_eq!(scheduler.snapshot().best_move.as_deref(), Some("e2e4"));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_before_quiet_period() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;

        scheduler.set_position(AFTER_E4);
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.set_position(AFTER_D4);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(positions(&mock).len(), 1);

        settle().await;
        assert_eq!(
            positions(&mock).last(),
            Some(&format!("position fen {}", AFTER_D4))
        );
        assert_eq!(positions(&mock).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_clears_previous_results() {
        let script = MockScript::default().then_on_go(["info depth 3 seldepth 4 nodes 100"]);
        let mock = MockSpawner::with_script(script);
        let scheduler = mount(&mock, START);
        settle().await;
        assert_eq!(scheduler.snapshot().best_move.as_deref(), Some("e2e4"));

        scheduler.set_position(AFTER_E4);
        settle().await;

        let snapshot = scheduler.snapshot();
        assert!(snapshot.variations.is_empty());
        assert_eq!(snapshot.best_move, None);
        assert_eq!(snapshot.current_depth, 0);
        assert!(snapshot.is_analyzing);
    }

    #[tokio::test(start_paused = true)]
    async fn depth_change_reanalyzes() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;

        scheduler.set_depth(14);
        settle().await;

        assert_eq!(mock.commands().last().map(String::as_str), Some("go depth 14"));
        assert_eq!(positions(&mock).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_request_is_ignored() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;
        let before = mock.commands().len();

        scheduler.set_request(AnalysisRequest::new(START, 10));
        scheduler.set_position(START);
        scheduler.set_depth(10);
        settle().await;

        assert_eq!(mock.commands().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_search_never_leaks() {
        let script = MockScript::default()
            .on_go(["info depth 5 multipv 1 score cp 99 pv a2a3"])
            .then_on_go([
                "info depth 10 multipv 1 score cp 30 pv e2e4 e7e5",
                "bestmove e2e4",
            ])
            .on_stop(["bestmove a2a3"]);
        let mock = MockSpawner::with_script(script);
        let scheduler = mount(&mock, START);
        settle().await;
        assert_eq!(scheduler.snapshot().evaluation(), Some(Score::Centipawns(99)));

        scheduler.set_position(AFTER_E4);
        settle().await;

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.variations.len(), 1);
        assert_eq!(snapshot.evaluation(), Some(Score::Centipawns(-30)));
        assert_eq!(snapshot.best_move.as_deref(), Some("e2e4"));
        assert!(!snapshot.is_analyzing);

        let tail: Vec<String> = mock.commands().into_iter().rev().take(4).collect();
        assert_eq!(
            tail,
            vec![
                "go depth 10".to_string(),
                format!("position fen {}", AFTER_E4),
                "isready".to_string(),
                "stop".to_string(),
            ]
        );
    }
}

mod teardown {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unmount_cancels_pending_debounce() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;

        scheduler.set_position(AFTER_E4);
        scheduler.unmount().await;
        settle().await;

        assert_eq!(positions(&mock).len(), 1);
        assert_eq!(mock.commands().last().map(String::as_str), Some("quit"));
        assert_eq!(mock.live_workers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_engine() {
        let mock = MockSpawner::new();
        let scheduler = mount(&mock, START);
        settle().await;
        assert_eq!(mock.live_workers(), 1);

        drop(scheduler);
        settle().await;

        assert_eq!(mock.live_workers(), 0);
        assert_eq!(mock.commands().last().map(String::as_str), Some("quit"));
    }
}

mod failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unavailable_host_stays_idle() {
        let scheduler = AnalysisScheduler::mount(
            SchedulerConfig::default(),
            EngineHost::Unavailable,
            AnalysisRequest::new(START, 10),
        );
        scheduler.set_position(AFTER_E4);
        settle().await;

        let snapshot = scheduler.snapshot();
        assert!(!snapshot.is_ready);
        assert!(!snapshot.is_analyzing);
        assert!(snapshot.variations.is_empty());
        assert_eq!(snapshot.error, None);
        scheduler.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_is_reported() {
        let mock = MockSpawner::failing("no such file");
        let scheduler = mount(&mock, START);
        settle().await;

        let snapshot = scheduler.snapshot();
        assert!(!snapshot.is_ready);
        assert!(!snapshot.is_analyzing);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Failed to create engine worker: Engine process could not be started: no such file")
        );
        assert_eq!(mock.spawn_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_error_stops_analyzing() {
        let script = MockScript::default()
            .on_go(["info depth 4 multipv 1 score cp 12 pv g1f3"])
            .then_error("Engine process exited");
        let mock = MockSpawner::with_script(script);
        let scheduler = mount(&mock, START);
        settle().await;

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("Engine process exited"));
        assert!(!snapshot.is_analyzing);
        assert_eq!(snapshot.evaluation(), Some(Score::Centipawns(12)));
    }
}

mod attribution {
    use super::*;
    use analysis::AnalysisSnapshot;
    use engine::Variation;

    /// A best move is only ever shown next to lines from the same search.
    fn assert_consistent(snapshot: &AnalysisSnapshot) {
        match snapshot.best_move.as_deref() {
            None => {}
            Some("e2e4") => {
                assert_eq!(snapshot.current_depth, 10, "{:?}", snapshot);
                assert_eq!(snapshot.variations.len(), 1, "{:?}", snapshot);
            }
            Some("e7e5") => {
                assert_eq!(snapshot.current_depth, 12, "{:?}", snapshot);
                assert_eq!(snapshot.variations.len(), 1, "{:?}", snapshot);
            }
            Some(other) => panic!("unexpected best move {}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn output_from_outgoing_search_is_dropped_after_fire() {
        for _ in 0..20 {
            let mock = MockSpawner::with_script(
                MockScript::default()
                    .on_go(["info depth 10 multipv 1 score cp 30 pv e2e4 e7e5", "bestmove e2e4"])
                    .then_on_go(["info depth 12 multipv 1 score cp 15 pv e7e5 g1f3", "bestmove e7e5"]),
            );
            let config = SchedulerConfig {
                debounce: Duration::ZERO,
                ..SchedulerConfig::default()
            };
            let scheduler = AnalysisScheduler::mount(
                config,
                EngineHost::available(mock.clone()),
                AnalysisRequest::new(START, 10),
            );
            let mut updates = scheduler.subscribe();

            tokio::time::timeout(Duration::from_secs(2), updates.wait_for(|s| s.is_ready))
                .await
                .expect("engine never became ready")
                .unwrap();
            scheduler.set_position(AFTER_E4);

            let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
                loop {
                    let snapshot = updates.borrow_and_update().clone();
                    assert_consistent(&snapshot);
                    if snapshot.best_move.as_deref() == Some("e7e5") {
                        return snapshot;
                    }
                    updates.changed().await.unwrap();
                }
            })
            .await
            .expect("second search never finished");

            assert!(!snapshot.is_analyzing);
            assert_eq!(
                snapshot.variations,
                vec![Variation {
                    rank: 1,
                    depth: 12,
                    score: Score::Centipawns(-15),
                    moves: vec!["e7e5".to_string(), "g1f3".to_string()],
                }]
            );
            scheduler.unmount().await;
        }
    }
}
