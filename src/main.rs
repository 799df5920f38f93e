//! Perspective on the Vortex headless runner
//!
//! Replays a move list against one puzzle and reports the outcome:
//!
//! ```text
//! perspective-vortex worlds/tutorial.json 2 launch rotate:157,0 rotate:0,-157 launch
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod runner {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::Parser;

    use perspective_vortex::persistence::SolutionStore;
    use perspective_vortex::progress::{WorldProgress, next_world};
    use perspective_vortex::sim::{GameEvent, Perspective, StepStatus, Verdict};
    use perspective_vortex::{MoveBand, Settings, World, score_to_stars};

    /// Fixed frame time for replayed launches (seconds)
    const FRAME_DT: f32 = 1.0 / 60.0;

    /// Replay a move list against one puzzle
    #[derive(Parser, Debug)]
    #[command(name = "perspective-vortex")]
    #[command(about = "Rotate the cube, launch the ship: replay a puzzle headless")]
    pub struct Args {
        /// World definition (JSON)
        pub world: PathBuf,

        /// Puzzle number within the world, starting at 1
        pub puzzle: usize,

        /// Moves in order: `launch` or `rotate:<dx>,<dy>` (drag, then snap)
        #[arg(value_parser = parse_command)]
        pub moves: Vec<Command>,

        /// Settings file; defaults apply when missing
        #[arg(long, env = "PERSPECTIVE_SETTINGS")]
        pub settings: Option<PathBuf>,

        /// Solution store directory; a winning replay is saved here
        #[arg(long, env = "PERSPECTIVE_SOLUTIONS")]
        pub solutions: Option<PathBuf>,
    }

    /// One replayed input
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Command {
        Launch,
        /// Drag by (dx, dy), then snap
        Rotate(f32, f32),
    }

    fn parse_command(s: &str) -> Result<Command, String> {
        if s == "launch" {
            return Ok(Command::Launch);
        }
        let (dx, dy) = s
            .strip_prefix("rotate:")
            .and_then(|deltas| deltas.split_once(','))
            .ok_or_else(|| format!("expected `launch` or `rotate:<dx>,<dy>`, got {s}"))?;
        let dx = dx.trim().parse().map_err(|e| format!("bad dx in {s}: {e}"))?;
        let dy = dy.trim().parse().map_err(|e| format!("bad dy in {s}: {e}"))?;
        Ok(Command::Rotate(dx, dy))
    }

    pub fn run(args: Args) -> Result<()> {
        let settings = args.settings.map(Settings::load).unwrap_or_default();
        let world = World::load(&args.world)
            .with_context(|| format!("loading {}", args.world.display()))?;
        let puzzle = world.puzzle(args.puzzle)?;
        log::info!(
            "World '{}' puzzle {}/{}: {}",
            world.name,
            args.puzzle,
            world.puzzle_count(),
            puzzle.description
        );
        log::info!("Outline: {}", settings.effective_outline(&world));

        let mut perspective = Perspective::new(world.size, settings);
        perspective.import_puzzle(puzzle)?;

        let mut verdict = None;
        for command in args.moves {
            if perspective.is_game_over() {
                log::warn!("Game over; ignoring remaining moves");
                break;
            }
            match command {
                Command::Rotate(dx, dy) => {
                    perspective.rotate(dx, dy);
                    perspective.rotate_to_axis()?;
                }
                Command::Launch => {
                    if !perspective.launch()? {
                        log::warn!("Launch ignored in {:?}", perspective.phase());
                        continue;
                    }
                    verdict = Some(replay_launch(&mut perspective));
                }
            }
            report(perspective.drain_events());
        }

        let score = perspective.solution().score;
        let target = puzzle.target;
        let band = MoveBand::classify(score, target);
        println!("moves: {score} (target {target}, {})", band.colour());

        match verdict {
            Some(Verdict::Won) => {
                println!("won: {} stars", score_to_stars(score, target));
                if let Some(root) = args.solutions {
                    let store = SolutionStore::new(root);
                    let hash = puzzle.content_hash()?;
                    if store
                        .save_if_better(&world.name, &hash, perspective.solution())
                        .context("saving solution")?
                    {
                        println!("new best saved");
                    }
                    let progress = WorldProgress::load(&world, &store);
                    println!(
                        "progress: {}/{} stars{}",
                        progress.total_stars(),
                        progress.max_stars(),
                        if progress.is_complete() {
                            format!(", next world '{}'", next_world(&world.name))
                        } else {
                            String::new()
                        }
                    );
                }
            }
            Some(Verdict::Lost) => println!("lost"),
            Some(Verdict::Continue { .. }) | None => println!("unsolved"),
        }
        Ok(())
    }

    fn replay_launch(perspective: &mut Perspective) -> Verdict {
        loop {
            match perspective.advance(FRAME_DT) {
                StepStatus::Completed(verdict) => return verdict,
                StepStatus::InProgress => {}
                StepStatus::Idle => {
                    return perspective
                        .complete_launch()
                        .unwrap_or(Verdict::Continue { dialogs: Vec::new() });
                }
            }
        }
    }

    fn report(events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::BlockHit { sphere, block } => println!("{sphere} hit {block}"),
                GameEvent::SphereHit { sphere, other } => println!("{sphere} stopped by {other}"),
                GameEvent::PortalTraversed { sphere, from, to } => println!(
                    "{sphere} portal ({},{},{}) -> ({},{},{})",
                    from.x, from.y, from.z, to.x, to.y, to.z
                ),
                GameEvent::OutlineCrossed { sphere } => println!("{sphere} left the outline"),
                GameEvent::DialogsReady(names) => println!("dialogs: {}", names.join(", ")),
                other => log::debug!("{other:?}"),
            }
        }
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use clap::Parser;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    runner::run(runner::Args::parse())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by a host on the web; there is no CLI there
}
