use crate::config::Config;
use crate::error::Result;
use crate::executor::FixedThreadPool;

/// Run `f` against a fresh pool and close the pool on the way out.
///
/// The pool is closed whether `f` returns normally or unwinds, so every
/// submitted task has run (or been recorded) by the time this returns.
/// Whatever `f` returns, including an `Err`, is handed back unchanged.
///
/// ```no_run
/// use fixed_pool::{scope, Config};
///
/// let sums = scope(Config::default(), |pool: &fixed_pool::FixedThreadPool<u64>| {
///     for value in 0..100u64 {
///         pool.submit(move || Ok::<_, std::io::Error>(value + value))?;
///     }
///     pool.drain();
///     pool.raise_first()?;
///     Ok::<_, fixed_pool::Error>(pool.returns())
/// })
/// .unwrap();
/// ```
pub fn scope<T, F, R>(config: Config, f: F) -> Result<R>
where
    T: Send + 'static,
    F: FnOnce(&FixedThreadPool<T>) -> R,
{
    let pool = FixedThreadPool::new(config)?;
    let result = f(&pool);
    pool.close()?;
    Ok(result)
}
