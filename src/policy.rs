use crate::model::RepeatMode;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderContext {
    pub track_count: usize,
    pub current: Option<usize>,
    pub repeat: RepeatMode,
    pub shuffle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    PlayIndex(usize),
    /// Replay the current track from the start.
    Restart,
    Stop,
    NoAction,
}

/// Picks the track that follows the current one.
///
/// Under shuffle the current index is pushed onto `history` before a new
/// index is drawn, so `decide_previous` can walk back through it.
pub fn decide_next<R: Rng + ?Sized>(
    ctx: OrderContext,
    history: &mut Vec<usize>,
    rng: &mut R,
) -> Decision {
    if ctx.repeat == RepeatMode::One {
        return Decision::Restart;
    }

    // A lone track loops under shuffle instead of ending playback.
    if ctx.shuffle && ctx.track_count == 1 {
        return Decision::PlayIndex(0);
    }

    if ctx.shuffle && ctx.track_count > 1 {
        if let Some(current) = ctx.current {
            history.push(current);
        }
        let candidate = rng.random_range(0..ctx.track_count);
        return Decision::PlayIndex(resolve_shuffle_pick(
            candidate,
            ctx.current,
            ctx.track_count,
        ));
    }

    let next = ctx.current.map_or(0, |current| current + 1);
    if next < ctx.track_count {
        Decision::PlayIndex(next)
    } else if ctx.repeat == RepeatMode::All && ctx.track_count > 0 {
        Decision::PlayIndex(0)
    } else {
        Decision::Stop
    }
}

pub fn decide_previous(ctx: OrderContext, history: &mut Vec<usize>) -> Decision {
    if ctx.shuffle
        && let Some(previous) = history.pop()
    {
        return Decision::PlayIndex(previous);
    }

    if let Some(previous) = ctx.current.and_then(|current| current.checked_sub(1)) {
        Decision::PlayIndex(previous)
    } else if ctx.repeat == RepeatMode::All && ctx.track_count > 0 {
        Decision::PlayIndex(ctx.track_count - 1)
    } else {
        Decision::NoAction
    }
}

/// Steps a random draw off the current track. Only guarantees a different
/// track; the result is not uniform.
pub fn resolve_shuffle_pick(candidate: usize, current: Option<usize>, track_count: usize) -> usize {
    if track_count <= 1 {
        return 0;
    }
    if Some(candidate) == current {
        (candidate + 1) % track_count
    } else {
        candidate
    }
}
