use crate::sprite::Sprite;

/// Time-driven frame selection over a fixed sprite list.
///
/// The current frame is a deterministic function of total elapsed time and
/// phase, not of update call frequency, so irregular tick intervals never
/// cause drift. Playback loops forever; callers freeze it by withholding
/// `update`.
#[derive(Clone, Debug)]
pub struct Animation {
    frames: Vec<Sprite>,
    rate: f32,
    phase: u32,
    elapsed: f32,
}

impl Animation {
    /// `rate` is in frames per second. `phase` offsets the frame cursor so
    /// multiple instances sharing one frame list do not play in lockstep.
    pub fn new(frames: Vec<Sprite>, rate: f32, phase: u32) -> Self {
        assert!(!frames.is_empty(), "animation needs at least one frame");
        Self { frames, rate, phase, elapsed: 0.0 }
    }

    /// Advance by a caller-supplied delta in seconds. Time must be monotonic.
    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    fn frame_index(&self) -> usize {
        let cursor = (self.elapsed * self.rate).floor() as u64 + u64::from(self.phase);
        (cursor % self.frames.len() as u64) as usize
    }

    /// Pure read of the frame list at the computed index.
    pub fn current_frame(&self) -> Sprite {
        self.frames[self.frame_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::PixelRect;

    fn frames(n: u32) -> Vec<Sprite> {
        (0..n)
            .map(|i| Sprite::from_pixel_rect(n * 16, 16, PixelRect { x: i * 16, y: 0, w: 16, h: 16 }))
            .collect()
    }

    #[test]
    fn index_follows_elapsed_time() {
        // 6 frames at 24 fps: t = 0.3s gives floor(7.2) mod 6 = 1.
        let mut anim = Animation::new(frames(6), 24.0, 0);
        anim.update(0.3);
        assert_eq!(anim.current_frame(), anim.frames[1]);
    }

    #[test]
    fn jittered_updates_match_single_step() {
        let mut coarse = Animation::new(frames(6), 24.0, 0);
        let mut jittered = Animation::new(frames(6), 24.0, 0);
        coarse.update(0.3);
        for dt in [0.05, 0.012, 0.2, 0.038] {
            jittered.update(dt);
        }
        assert_eq!(coarse.current_frame(), jittered.current_frame());
    }

    #[test]
    fn phase_offsets_the_cursor() {
        let base = Animation::new(frames(4), 10.0, 0);
        let shifted = Animation::new(frames(4), 10.0, 1);
        assert_eq!(base.current_frame(), base.frames[0]);
        assert_eq!(shifted.current_frame(), shifted.frames[1]);
    }

    #[test]
    fn current_frame_is_idempotent() {
        let mut anim = Animation::new(frames(3), 24.0, 0);
        anim.update(0.7);
        assert_eq!(anim.current_frame(), anim.current_frame());
    }

    #[test]
    fn playback_wraps_around() {
        let mut anim = Animation::new(frames(6), 24.0, 0);
        anim.update(10.0); // floor(240) mod 6 = 0
        assert_eq!(anim.current_frame(), anim.frames[0]);
    }
}
