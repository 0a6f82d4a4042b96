//! One-way bridge from an external abort signal into an internal one.

use super::{AbortSignal, Subscription};

/// Forwards an abort of `external` into `internal`, converting the reason
/// with `map`.
///
/// The link is one-directional: aborting `internal` never touches
/// `external`. The returned subscription detaches the link; it is inert if
/// `external` was already aborted, in which case `internal` is aborted
/// before this returns.
pub fn forward_abort<R, S, M>(
    external: &AbortSignal<R>,
    internal: &AbortSignal<S>,
    map: M,
) -> Subscription
where
    R: Clone + Send + 'static,
    S: Clone + Send + 'static,
    M: FnOnce(&R) -> S + Send + 'static,
{
    let internal = internal.clone();
    external.on_aborted(move |reason| {
        internal.abort(map(reason));
    })
}
