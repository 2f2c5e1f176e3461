//! Tile Raider entry point
//!
//! Native builds run the simulation headless with a simple autopilot, which
//! is handy for tuning biome tables. The browser build exposes a small game
//! handle to JavaScript; the page owns the canvas, input and GPU upload.

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use wasm_bindgen::prelude::*;

    use tile_raider::GameConfig;
    use tile_raider::persistence::LocalStore;
    use tile_raider::render::{BufferWriter, TileSet};
    use tile_raider::sim::{InputState, Level};

    #[wasm_bindgen]
    pub struct WebGame {
        level: Level,
        font: TileSet,
        tileset: TileSet,
        text: BufferWriter,
        game: BufferWriter,
    }

    #[wasm_bindgen]
    impl WebGame {
        #[wasm_bindgen(constructor)]
        pub fn new() -> Result<WebGame, JsValue> {
            let store = LocalStore;
            let config = GameConfig::load(&store);
            let mut level = Level::new(&config, Box::new(store))
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            level
                .spawn_initial()
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(WebGame {
                level,
                font: TileSet::new(16, 16),
                tileset: TileSet::new(8, 8),
                text: BufferWriter::new(),
                game: BufferWriter::new(),
            })
        }

        /// Advance one frame with the given key state
        pub fn tick(&mut self, up: bool, down: bool, left: bool, right: bool, fire: bool) {
            if fire {
                if let Err(e) = self.level.start() {
                    log::debug!("Start ignored: {}", e);
                }
            }
            self.level.set_input(InputState {
                up,
                down,
                left,
                right,
                fire,
            });
            self.level.tick();
        }

        /// Rebuild both vertex buffers
        pub fn draw(&mut self) {
            self.text.clear();
            self.game.clear();
            self.level
                .draw(&self.font, &mut self.text, &self.tileset, &mut self.game);
        }

        pub fn game_vertices(&self) -> Vec<u8> {
            self.game.as_bytes().to_vec()
        }

        pub fn text_vertices(&self) -> Vec<u8> {
            self.text.as_bytes().to_vec()
        }

        /// Events since the last call, as JSON for the page's audio layer
        pub fn events(&mut self) -> String {
            serde_json::to_string(&self.level.drain_events()).unwrap_or_default()
        }

        pub fn score(&self) -> f64 {
            self.level.score() as f64
        }

        pub fn is_dead(&self) -> bool {
            self.level.state() == tile_raider::sim::GameState::Dead
        }
    }

    #[wasm_bindgen(start)]
    pub fn wasm_main() {
        tile_raider::init_logging();
        log::info!("Tile Raider (web) ready");
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use anyhow::{Context, Result, anyhow};

    use tile_raider::GameConfig;
    use tile_raider::consts::TILE_SIZE;
    use tile_raider::persistence::MemoryStore;
    use tile_raider::sim::{GameEvent, GameState, InputState, Level};
    use tile_raider::world_to_tile;

    const DEFAULT_TICKS: u64 = 60 * 60 * 5;
    /// Columns the autopilot looks ahead
    const LOOKAHEAD: i64 = 12;

    /// `tile-raider [config.json] [ticks]`
    pub fn run() -> Result<()> {
        tile_raider::init_logging();

        let mut args = std::env::args().skip(1);
        let config = match args.next() {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config {path}"))?;
                GameConfig::from_json(&json).with_context(|| format!("parsing config {path}"))?
            }
            None => GameConfig::default(),
        };
        let ticks = match args.next() {
            Some(n) => n
                .parse::<u64>()
                .map_err(|e| anyhow!("invalid tick count '{n}': {e}"))?,
            None => DEFAULT_TICKS,
        };

        let mut level = Level::new(&config, Box::new(MemoryStore::new()))?;
        level.spawn_initial()?;
        level.start()?;
        log::info!("Running {} ticks (seed {})", ticks, level.seed());

        let mut kills = 0u32;
        let mut coins = 0u32;
        for _ in 0..ticks {
            level.set_input(autopilot(&level));
            level.tick();
            for event in level.drain_events() {
                match event {
                    GameEvent::Explosion { .. } => kills += 1,
                    GameEvent::Coin { kind } => {
                        coins += 1;
                        log::debug!("Collected {:?}", kind);
                    }
                    GameEvent::BiomeChanged { index } => log::info!("Biome {}", index),
                    _ => {}
                }
            }
            if level.state() == GameState::Dead {
                break;
            }
        }

        log::info!(
            "Finished after {} ticks: score {}, {} segments, {} explosions, {} power-ups, {:?}",
            level.age(),
            level.score(),
            level.total_segments(),
            kills,
            coins,
            level.state()
        );
        Ok(())
    }

    /// Always firing; steers toward whichever nearby row has the longest
    /// clear run ahead of the ship
    fn autopilot(level: &Level) -> InputState {
        let mut input = InputState {
            fire: true,
            ..Default::default()
        };
        let Some(pos) = level.player_position() else {
            return input;
        };
        let (tx, ty) = world_to_tile(pos);

        let clear_run = |row: i64| {
            (0..LOOKAHEAD)
                .take_while(|dx| {
                    (-1..=1).all(|dy| {
                        level
                            .get_tile(tx + dx, row + dy)
                            .is_ok_and(|id| !tile_raider::sim::tile::is_solid(id))
                    })
                })
                .count()
        };

        let here = clear_run(ty);
        let above = clear_run(ty - 2);
        let below = clear_run(ty + 2);
        if above > here && above >= below {
            input.up = true;
        } else if below > here {
            input.down = true;
        }

        // Drift back toward the left third of the screen
        let screen_x = pos.x - level.scroll() as f32;
        if screen_x > 8.0 * TILE_SIZE {
            input.left = true;
        }
        input
    }
}
