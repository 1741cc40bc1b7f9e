/// Frame-advanceable animation clips keyed by `"{entity}/{action}"`.
///
/// The simulation only tracks which frame of which clip is showing;
/// the renderer decides what a frame looks like.

/// Shape of a clip: how many frames, how many ticks each frame shows,
/// and whether it wraps around.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClipSpec {
    pub frames: u32,
    pub frame_dur: u32,
    pub looping: bool,
}

impl ClipSpec {
    pub const fn looped(frames: u32, frame_dur: u32) -> Self {
        ClipSpec { frames, frame_dur, looping: true }
    }

    pub const fn once(frames: u32, frame_dur: u32) -> Self {
        ClipSpec { frames, frame_dur, looping: false }
    }

    fn ticks(&self) -> u32 {
        (self.frames * self.frame_dur).max(1)
    }
}

/// Clip table. Unknown keys get a single static frame.
pub fn clip(key: &str) -> ClipSpec {
    // the winter skin shares clip shapes with the default one
    let normalized;
    let key = match key.strip_prefix("player/winter/") {
        Some(rest) => {
            normalized = format!("player/{rest}");
            normalized.as_str()
        }
        None => key,
    };
    match key {
        "player/idle" => ClipSpec::looped(22, 6),
        "player/run" => ClipSpec::looped(8, 4),
        "player/jump" | "player/wall_slide" => ClipSpec::looped(1, 5),
        "player/hit" => ClipSpec::looped(2, 3),
        "player/random1" | "player/random2" | "player/random3" | "player/random4" => {
            ClipSpec::looped(10, 5)
        }
        "squirrel1/idle" | "squirrel2/idle" | "cat/idle" => ClipSpec::looped(4, 6),
        "squirrel1/run" | "squirrel2/run" | "cat/run" => ClipSpec::looped(6, 4),
        "particle/boostgas" => ClipSpec::once(5, 6),
        "particle/fireball" | "particle/fireswing" => ClipSpec::looped(4, 3),
        _ => ClipSpec::looped(1, 1),
    }
}

/// Which image of a clip to draw, and how to mirror it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FrameRef {
    pub index: u32,
    pub flip_x: bool,
    pub flip_y: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    spec: ClipSpec,
    /// Tick counter within the clip (not the image index).
    pub frame: u32,
    pub done: bool,
}

impl Animation {
    pub fn new(spec: ClipSpec) -> Self {
        Animation { spec, frame: 0, done: false }
    }

    pub fn for_key(key: &str) -> Self {
        Animation::new(clip(key))
    }

    /// Start partway through, e.g. to desynchronise particles.
    pub fn starting_at(spec: ClipSpec, frame: u32) -> Self {
        Animation { spec, frame: frame.min(spec.ticks() - 1), done: false }
    }

    pub fn update(&mut self) {
        let ticks = self.spec.ticks();
        if self.spec.looping {
            self.frame = (self.frame + 1) % ticks;
        } else {
            self.frame = (self.frame + 1).min(ticks - 1);
            if self.frame >= ticks - 1 {
                self.done = true;
            }
        }
    }

    pub fn current_frame(&self, flip_x: bool, flip_y: bool) -> FrameRef {
        FrameRef {
            index: self.frame / self.spec.frame_dur.max(1),
            flip_x,
            flip_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_clip_wraps() {
        let mut a = Animation::new(ClipSpec::looped(2, 3));
        for _ in 0..6 {
            a.update();
        }
        assert_eq!(a.frame, 0);
        assert!(!a.done);
    }

    #[test]
    fn one_shot_clip_finishes_and_holds() {
        let mut a = Animation::new(ClipSpec::once(2, 3));
        for _ in 0..4 {
            a.update();
        }
        assert!(!a.done);
        a.update();
        assert!(a.done);
        assert_eq!(a.current_frame(false, false).index, 1);
        a.update();
        assert_eq!(a.frame, 5);
    }

    #[test]
    fn winter_skin_shares_shapes() {
        assert_eq!(clip("player/winter/run"), clip("player/run"));
        assert_eq!(clip("no/such/clip"), ClipSpec::looped(1, 1));
    }

    #[test]
    fn start_frame_is_clamped() {
        let a = Animation::starting_at(ClipSpec::once(5, 6), 100);
        assert_eq!(a.frame, 29);
    }
}
