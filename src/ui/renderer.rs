/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!` and flushed once
///   5. Swap front/back
///
/// World space is pixels. One tile (16 px) maps to 2 columns × 1 row,
/// so a column covers 8 px horizontally and a row 16 px vertically.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use bailey::config::Season;
use bailey::domain::enemy::EnemyKind;
use bailey::domain::geom::{Rect, Vec2};
use bailey::domain::physics::Facing;
use bailey::domain::player::{PlayerAction, MAX_ENERGY};
use bailey::domain::tile::TileKind;
use bailey::sim::world::{Camera, Phase, WorldState};

const COL_PX: f32 = 8.0;
const ROW_PX: f32 = 16.0;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, help line below.
const RESERVED_ROWS: usize = MAP_ROW + 2;

const ENERGY_BAR: usize = 15;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell, never the terminal default,
    /// so inter-row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Cell::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            Some(&mut self.cells[y * self.width + x])
        } else {
            None
        }
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(c) = self.get_mut(x, y) {
            *c = cell;
        }
    }

    /// Draw a glyph, keeping whatever background is already there.
    fn put_fg(&mut self, x: usize, y: usize, ch: char, fg: Color) {
        if let Some(c) = self.get_mut(x, y) {
            c.ch = ch;
            c.fg = fg;
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }
}

// ── Projection ──

/// Map viewport: terminal cells available to the world view.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Viewport {
    cols: usize,
    rows: usize,
}

/// Terminal cell of a world point, relative to the map origin.
fn to_screen(p: Vec2, cam: &Camera, view: Viewport) -> Option<(usize, usize)> {
    let (sx, sy) = cam.render_scroll();
    let col = ((p.x - sx as f32) / COL_PX).floor();
    let row = ((p.y - sy as f32) / ROW_PX).floor();
    if col < 0.0 || row < 0.0 || col >= view.cols as f32 || row >= view.rows as f32 {
        return None;
    }
    Some((col as usize, row as usize))
}

fn energy_bar(energy: f32) -> String {
    let filled = ((energy / MAX_ENERGY) * ENERGY_BAR as f32).ceil().clamp(0.0, ENERGY_BAR as f32) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(ENERGY_BAR - filled))
}

fn sky(season: Season) -> Color {
    match season {
        Season::Summer => Color::Rgb { r: 24, g: 34, b: 58 },
        Season::Autumn => Color::Rgb { r: 40, g: 28, b: 30 },
        Season::Winter => Color::Rgb { r: 34, g: 38, b: 48 },
        Season::Tropic => Color::Rgb { r: 16, g: 40, b: 44 },
    }
}

/// Two-column glyph and colour for a tile kind; `None` draws nothing.
fn tile_glyph(kind: &TileKind) -> Option<([char; 2], Color)> {
    let g = match kind {
        TileKind::Grass => (['▓', '▓'], Color::Rgb { r: 70, g: 170, b: 60 }),
        TileKind::Autumn => (['▓', '▓'], Color::Rgb { r: 200, g: 110, b: 40 }),
        TileKind::Ice => (['▓', '▓'], Color::Rgb { r: 170, g: 220, b: 240 }),
        TileKind::Tropic => (['▓', '▓'], Color::Rgb { r: 220, g: 200, b: 90 }),
        TileKind::MovingTile => (['▀', '▀'], Color::Rgb { r: 150, g: 150, b: 170 }),
        TileKind::FireSwing => (['◖', '◗'], Color::Rgb { r: 120, g: 60, b: 40 }),
        TileKind::FireHole => (['▄', '▄'], Color::Rgb { r: 200, g: 50, b: 20 }),
        TileKind::Tree | TileKind::SummerTree => (['♣', '♣'], Color::Rgb { r: 40, g: 120, b: 50 }),
        TileKind::Fence => (['╫', '╫'], Color::Rgb { r: 140, g: 100, b: 60 }),
        TileKind::Building => (['▒', '▒'], Color::Rgb { r: 110, g: 100, b: 120 }),
        TileKind::LargeDecor => (['░', '░'], Color::Rgb { r: 80, g: 90, b: 80 }),
        TileKind::Food => (['●', ' '], Color::Rgb { r: 250, g: 90, b: 90 }),
        TileKind::FinishLine => (['▌', '▐'], Color::White),
        TileKind::Checkpoint => (['¶', ' '], Color::Rgb { r: 200, g: 200, b: 80 }),
        TileKind::Spawners => return None,
        TileKind::Unknown(_) => (['?', '?'], Color::DarkGrey),
    };
    Some(g)
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    frame: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.sync_size()?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn sync_size(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            cols: self.term_w,
            rows: self.term_h.saturating_sub(RESERVED_ROWS).max(1),
        }
    }

    /// Draw one frame. Also sizes the camera to the terminal.
    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        self.sync_size()?;
        self.frame += 1;

        let view = self.viewport();
        world.camera.view_w = view.cols as f32 * COL_PX;
        world.camera.view_h = view.rows as f32 * ROW_PX;

        if self.last_phase != Some(world.phase) {
            self.back.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.fill(Cell::BLANK);
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::GameOver => {
                self.compose_game(world, view);
                self.compose_banner(&["GAME OVER", "", "ENTER: play again   ESC: quit"], world, view);
            }
            Phase::Finale => self.compose_finale(world),
            Phase::Paused => {
                self.compose_game(world, view);
                self.compose_banner(&["PAUSED", "", "P: resume   ESC: quit"], world, view);
            }
            Phase::LevelCleared => {
                self.compose_game(world, view);
                self.compose_banner(&["LEVEL CLEAR!"], world, view);
            }
            Phase::Playing | Phase::Dying => self.compose_game(world, view),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState, view: Viewport) {
        self.compose_hud(w);

        let bg = sky(w.level.season);
        for row in 0..view.rows {
            for col in 0..view.cols {
                self.front.set(col, MAP_ROW + row, Cell::new(' ', Color::White, bg));
            }
        }

        self.compose_tiles(w, view);
        self.compose_entities(w, view);
        self.compose_effects(w, view);
        self.compose_iris(w, view);

        let help_row = MAP_ROW + view.rows + 1;
        let help = " ←/→ walk  C run  ↑/Z jump  X dash  P pause  ESC quit";
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let hud_bg = Color::Rgb { r: 20, g: 20, b: 60 };
        for x in 0..self.front.width {
            self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, hud_bg));
        }
        let hud = format!(
            " Level {:<2} Score {:<6} Hi {:<6} ♥×{}  ",
            w.level.index, w.score, w.high_score, w.lives,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, hud_bg);

        let x = hud.chars().count();
        let energy_color = if w.level.player.energy < MAX_ENERGY / 4.0 { Color::Red } else { Color::Green };
        let bar = energy_bar(w.level.player.energy);
        self.front.put_str(x, HUD_ROW, &bar, energy_color, hud_bg);

        let secs = w.seconds_remaining();
        let time = format!("  ⏱ {}:{:02}", secs / 60, secs % 60);
        let time_color = if secs <= 10 { Color::Red } else { Color::White };
        self.front.put_str(x + ENERGY_BAR, HUD_ROW, &time, time_color, hud_bg);
    }

    /// Put a 2-column glyph at a world point, glyph foreground only.
    fn put_glyph(&mut self, p: Vec2, glyph: [char; 2], fg: Color, cam: &Camera, view: Viewport) {
        if let Some((col, row)) = to_screen(p, cam, view) {
            self.front.put_fg(col, MAP_ROW + row, glyph[0], fg);
            if glyph[1] != ' ' && col + 1 < view.cols {
                self.front.put_fg(col + 1, MAP_ROW + row, glyph[1], fg);
            }
        }
    }

    fn put_char(&mut self, p: Vec2, ch: char, fg: Color, cam: &Camera, view: Viewport) {
        if let Some((col, row)) = to_screen(p, cam, view) {
            self.front.put_fg(col, MAP_ROW + row, ch, fg);
        }
    }

    fn compose_tiles(&mut self, w: &WorldState, view: Viewport) {
        let map = &w.level.map;
        let cam = &w.camera;

        for placed in map.offgrid() {
            if let Some((glyph, fg)) = tile_glyph(&placed.kind) {
                self.put_glyph(placed.pos, glyph, fg, cam, view);
            }
        }
        for tile in map.tiles() {
            if let Some((glyph, fg)) = tile_glyph(&tile.kind) {
                self.put_glyph(map.render_rect(tile).pos(), glyph, fg, cam, view);
            }
        }

        let passed = &w.level.player.passed_checkpoints;
        for cp in &w.level.checkpoints {
            let fg = if passed.contains(cp) { Color::Green } else { Color::Rgb { r: 200, g: 200, b: 80 } };
            self.put_glyph(*cp, ['¶', ' '], fg, cam, view);
        }
    }

    /// Fill every cell a rect touches with one glyph.
    fn put_rect(&mut self, rect: Rect, ch: char, fg: Color, cam: &Camera, view: Viewport) {
        let mut y = rect.top();
        while y < rect.bottom() {
            let mut x = rect.left();
            while x < rect.right() {
                self.put_char(Vec2::new(x, y), ch, fg, cam, view);
                x += COL_PX;
            }
            y += ROW_PX;
        }
    }

    fn compose_entities(&mut self, w: &WorldState, view: Viewport) {
        let cam = &w.camera;

        for enemy in &w.level.enemies {
            let stride = enemy.body.anim.current_frame(false, false).index % 2 == 1;
            let (ch, fg) = match (enemy.kind, enemy.body.facing, stride) {
                (EnemyKind::Cat, Facing::Left, _) => ('ᓚ', Color::Rgb { r: 230, g: 160, b: 60 }),
                (EnemyKind::Cat, Facing::Right, _) => ('ᓗ', Color::Rgb { r: 230, g: 160, b: 60 }),
                (_, Facing::Left, false) => ('◄', Color::Rgb { r: 170, g: 110, b: 70 }),
                (_, Facing::Left, true) => ('◁', Color::Rgb { r: 170, g: 110, b: 70 }),
                (_, Facing::Right, false) => ('►', Color::Rgb { r: 170, g: 110, b: 70 }),
                (_, Facing::Right, true) => ('▷', Color::Rgb { r: 170, g: 110, b: 70 }),
            };
            self.put_rect(enemy.body.rect(), ch, fg, cam, view);
        }

        let player = &w.level.player;
        // Blink: hidden every other 4 frames while recovering from a hit.
        if player.blink > 0 && (player.blink / 4) % 2 == 1 {
            return;
        }
        let fg = if player.is_fast_dashing() {
            Color::Cyan
        } else if w.phase == Phase::Dying {
            Color::DarkGrey
        } else {
            Color::Rgb { r: 250, g: 230, b: 120 }
        };
        let frame = player.body.anim.current_frame(false, false).index;
        let ch = match player.action {
            PlayerAction::Jump => '▲',
            PlayerAction::WallSlide => '▐',
            PlayerAction::Hit => '✶',
            PlayerAction::Run if frame % 2 == 1 => '▓',
            PlayerAction::Random(_) if frame % 4 == 2 => '▒',
            PlayerAction::Idle | PlayerAction::Run | PlayerAction::Random(_) => '█',
        };
        self.put_rect(player.rect(), ch, fg, cam, view);
    }

    fn compose_effects(&mut self, w: &WorldState, view: Viewport) {
        let cam = &w.camera;
        let fx = &w.level.effects;

        const PUFF: [char; 5] = ['●', '○', '°', '·', '·'];
        for p in &fx.particles {
            let frame = p.anim.current_frame(false, p.flip_y).index as usize;
            let ch = PUFF[frame.min(PUFF.len() - 1)];
            self.put_char(p.pos, ch, Color::Rgb { r: 150, g: 200, b: 255 }, cam, view);
        }
        for s in &fx.sparks {
            self.put_char(s.pos, '·', Color::Rgb { r: 255, g: 220, b: 120 }, cam, view);
        }
        for p in &fx.projectiles {
            self.put_char(p.pos, '•', Color::Rgb { r: 230, g: 230, b: 230 }, cam, view);
        }
        for f in &fx.fireballs {
            let ch = if f.anim.current_frame(false, f.flip_y).index % 2 == 0 { '✺' } else { '✹' };
            self.put_char(f.pos, ch, Color::Rgb { r: 255, g: 120, b: 30 }, cam, view);
        }
        for ball in &fx.fireswings {
            let hot = ball.anim.current_frame(false, false).index % 2 == 0;
            let fg = if hot { Color::Rgb { r: 255, g: 80, b: 20 } } else { Color::Rgb { r: 255, g: 160, b: 40 } };
            self.put_char(ball.pos, '●', fg, cam, view);
        }
        for mark in &fx.textmarks {
            if let Some((col, row)) = to_screen(mark.pos, cam, view) {
                for (i, ch) in mark.text.chars().enumerate() {
                    self.front.put_fg(col + i, MAP_ROW + row, ch, Color::White);
                }
            }
        }
    }

    /// Iris transition: black outside a circle around the player that
    /// shrinks as `|transition|` approaches 30.
    fn compose_iris(&mut self, w: &WorldState, view: Viewport) {
        let t = w.level.transition.abs();
        if t <= 0.0 {
            return;
        }
        let open = (1.0 - t / 30.0).max(0.0);
        let center = w.level.player.body.center();
        let radius = open * (w.camera.view_w.max(w.camera.view_h));
        let (sx, sy) = w.camera.render_scroll();

        for row in 0..view.rows {
            for col in 0..view.cols {
                let px = sx as f32 + (col as f32 + 0.5) * COL_PX;
                let py = sy as f32 + (row as f32 + 0.5) * ROW_PX;
                let (dx, dy) = (px - center.x, py - center.y);
                if dx * dx + dy * dy > radius * radius {
                    self.front.set(col, MAP_ROW + row, Cell::new(' ', Color::Black, Color::Black));
                }
            }
        }
    }

    fn compose_banner(&mut self, lines: &[&str], w: &WorldState, view: Viewport) {
        let panel = Color::Rgb { r: 40, g: 40, b: 40 };
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 6;
        let x0 = view.cols.saturating_sub(width) / 2;
        let y0 = MAP_ROW + view.rows.saturating_sub(lines.len() + 2) / 2;
        let blink = (self.frame / 16) % 2 == 0;

        for y in y0..y0 + lines.len() + 2 {
            for x in x0..x0 + width {
                self.front.set(x, y, Cell::new(' ', Color::White, panel));
            }
        }
        for (i, line) in lines.iter().enumerate() {
            let fg = if i == 0 && blink { Color::Rgb { r: 255, g: 220, b: 50 } } else { Color::White };
            let x = x0 + (width - line.chars().count()) / 2;
            self.front.put_str(x, y0 + 1 + i, line, fg, panel);
        }
        if w.score > 0 && w.score >= w.high_score && w.phase == Phase::GameOver {
            self.front.put_centered(y0 + lines.len() + 3, "★ NEW HIGH SCORE ★", Color::Yellow, Color::Reset);
        }
    }

    fn compose_title(&mut self, w: &WorldState) {
        let gold = Color::Rgb { r: 255, g: 220, b: 50 };
        let art = [
            "╔══════════════════════════════╗",
            "║     BAILEY'S  ADVENTURE      ║",
            "╚══════════════════════════════╝",
        ];
        for (i, line) in art.iter().enumerate() {
            self.front.put_centered(3 + i, line, gold, Color::Reset);
        }
        let hi = format!("High score: {}", w.high_score);
        self.front.put_centered(8, &hi, Color::White, Color::Reset);
        if (self.frame / 30) % 2 == 0 {
            self.front.put_centered(11, "Press any key to start", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        }
        self.front.put_centered(14, "←/→ walk   C run   ↑/Z jump   X dash", Color::DarkGrey, Color::Reset);
        self.front.put_centered(15, "P pause   ESC quit", Color::DarkGrey, Color::Reset);
    }

    fn compose_finale(&mut self, w: &WorldState) {
        let gold = Color::Rgb { r: 255, g: 220, b: 50 };
        let art = [
            "╔════════════════════════════════════╗",
            "║  ★ BAILEY MADE IT ALL THE WAY! ★   ║",
            "╚════════════════════════════════════╝",
        ];
        for (i, line) in art.iter().enumerate() {
            self.front.put_centered(4 + i, line, gold, Color::Reset);
        }
        let score = format!("Final score: {}", w.score);
        self.front.put_centered(9, &score, Color::White, Color::Reset);
        let hi = format!("High score: {}", w.high_score);
        self.front.put_centered(10, &hi, Color::White, Color::Reset);
        self.front.put_centered(13, "ENTER: play again   ESC: quit", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
    }
}
