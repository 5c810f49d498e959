//! Parallel checking: several oracles, each on its own thread, fed by project.

use super::DeclarationOracle;
use super::GenerateOutput;
use super::GenerateRequest;
use crate::context::tsconfig::find_tsconfig;
use crate::error::CheckerError;
use crate::error::DtsResult;
use crate::resolve::path::parent_dir;
use ahash::HashMap;
use ahash::HashMapExt;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::path::Path;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;
use tracing::warn;

enum Job {
  Generate(GenerateRequest, mpsc::Sender<DtsResult<GenerateOutput>>),
  Invalidate(String),
  BuildStart(mpsc::Sender<DtsResult<()>>),
  BuildEnd(mpsc::Sender<DtsResult<()>>),
}

/// A pending result from the pool.
pub struct Ticket<T>(mpsc::Receiver<DtsResult<T>>);

impl<T> Ticket<T> {
  /// Blocks until the worker answers.
  pub fn wait(self) -> DtsResult<T> {
    self
      .0
      .recv()
      .unwrap_or_else(|_| Err(CheckerError::PoolClosed.into()))
  }
}

type OracleFactory = Box<dyn Fn(usize) -> DtsResult<Box<dyn DeclarationOracle>> + Send + Sync>;

#[derive(Default)]
struct Workers {
  senders: Vec<mpsc::Sender<Job>>,
  handles: Vec<JoinHandle<()>>,
  /// Builds between their `build_start` and `build_end`.
  active_builds: usize,
  closed: bool,
}

/// Worker threads shared by every build using the pool. The threads stop when the last running
/// build ends and start again with the next build, unless the pool keeps them alive so
/// incremental programs stay warm.
pub struct CheckerPool {
  workers: Mutex<Workers>,
  size: usize,
  keep_alive: bool,
  tsconfig: Option<PathBuf>,
  factory: OracleFactory,
}

impl CheckerPool {
  /// Starts `workers` threads, each owning the oracle `factory` makes for it.
  pub fn spawn<F>(
    workers: usize,
    tsconfig: Option<PathBuf>,
    keep_alive: bool,
    factory: F,
  ) -> DtsResult<CheckerPool>
  where
    F: Fn(usize) -> DtsResult<Box<dyn DeclarationOracle>> + Send + Sync + 'static,
  {
    let pool = CheckerPool {
      workers: Mutex::new(Workers::default()),
      size: workers.max(1),
      keep_alive,
      tsconfig,
      factory: Box::new(factory),
    };
    pool.start(&mut pool.workers.lock())?;
    Ok(pool)
  }

  /// Number of running worker threads.
  pub fn workers(&self) -> usize {
    self.workers.lock().senders.len()
  }

  fn start(&self, workers: &mut Workers) -> DtsResult<()> {
    for index in 0..self.size {
      let oracle = (self.factory)(index)?;
      let (tx, rx) = mpsc::channel();
      let handle = std::thread::Builder::new()
        .name(format!("dts-checker-{index}"))
        .spawn(move || run_worker(oracle, rx))?;
      workers.senders.push(tx);
      workers.handles.push(handle);
    }
    debug!(workers = workers.senders.len(), "started checker pool");
    Ok(())
  }

  /// Drops the senders and waits for the workers to finish their queues.
  fn stop(&self) {
    let handles = {
      let mut workers = self.workers.lock();
      workers.senders.clear();
      std::mem::take(&mut workers.handles)
    };
    if handles.is_empty() {
      return;
    }
    for handle in handles {
      if handle.join().is_err() {
        warn!("checker worker panicked");
      }
    }
    debug!("stopped checker pool");
  }

  /// Queues `request` on the worker owning its project.
  pub fn submit(&self, request: GenerateRequest) -> Ticket<GenerateOutput> {
    let (tx, rx) = mpsc::channel();
    let workers = self.workers.lock();
    if !workers.senders.is_empty() {
      let index = route(&self.project_key(&request.id), workers.senders.len());
      // A dead worker drops the reply sender, which the ticket reports as a closed pool.
      let _ = workers.senders[index].send(Job::Generate(request, tx));
    }
    Ticket(rx)
  }

  pub fn invalidate(&self, file: &str) {
    for sender in self.workers.lock().senders.iter() {
      let _ = sender.send(Job::Invalidate(file.to_string()));
    }
  }

  pub fn build_start(&self) -> DtsResult<()> {
    {
      let mut workers = self.workers.lock();
      if workers.closed {
        return Err(CheckerError::PoolClosed.into());
      }
      if workers.senders.is_empty() {
        self.start(&mut workers)?;
      }
      workers.active_builds += 1;
    }
    self.broadcast(Job::BuildStart)
  }

  pub fn build_end(&self) -> DtsResult<()> {
    let result = self.broadcast(Job::BuildEnd);
    let idle = {
      let mut workers = self.workers.lock();
      workers.active_builds = workers.active_builds.saturating_sub(1);
      workers.active_builds == 0
    };
    if idle && !self.keep_alive {
      self.stop();
    }
    result
  }

  fn broadcast(&self, job: fn(mpsc::Sender<DtsResult<()>>) -> Job) -> DtsResult<()> {
    let tickets: Vec<Ticket<()>> = {
      let workers = self.workers.lock();
      if workers.senders.is_empty() {
        return Err(CheckerError::PoolClosed.into());
      }
      workers
        .senders
        .iter()
        .map(|sender| {
          let (tx, rx) = mpsc::channel();
          let _ = sender.send(job(tx));
          Ticket(rx)
        })
        .collect()
    };
    let mut first_error = None;
    for ticket in tickets {
      if let Err(err) = ticket.wait() {
        first_error.get_or_insert(err);
      }
    }
    first_error.map_or(Ok(()), Err)
  }

  /// Stops every worker for good.
  pub fn shutdown(&self) {
    self.workers.lock().closed = true;
    self.stop();
  }

  fn project_key(&self, file: &str) -> PathBuf {
    self
      .tsconfig
      .clone()
      .or_else(|| find_tsconfig(Path::new(parent_dir(file))))
      .unwrap_or_else(|| PathBuf::from(parent_dir(file)))
  }
}

impl Drop for CheckerPool {
  fn drop(&mut self) {
    self.shutdown();
  }
}

fn route(key: &Path, workers: usize) -> usize {
  let mut hasher = DefaultHasher::new();
  key.hash(&mut hasher);
  (hasher.finish() % workers as u64) as usize
}

fn run_worker(mut oracle: Box<dyn DeclarationOracle>, jobs: mpsc::Receiver<Job>) {
  for job in jobs {
    match job {
      Job::Generate(request, reply) => {
        let _ = reply.send(oracle.generate(&request));
      }
      Job::Invalidate(file) => oracle.invalidate(&file),
      Job::BuildStart(reply) => {
        let _ = reply.send(oracle.build_start());
      }
      Job::BuildEnd(reply) => {
        let _ = reply.send(oracle.build_end());
      }
    }
  }
}

/// An oracle answering from a shared [`CheckerPool`]. Files announced through `prefetch` are
/// checked while the host keeps walking the graph.
pub struct PooledOracle {
  pool: Arc<CheckerPool>,
  pending: HashMap<String, Ticket<GenerateOutput>>,
}

impl PooledOracle {
  pub fn new(pool: Arc<CheckerPool>) -> PooledOracle {
    PooledOracle {
      pool,
      pending: HashMap::new(),
    }
  }
}

impl DeclarationOracle for PooledOracle {
  fn build_start(&mut self) -> DtsResult<()> {
    self.pending.clear();
    self.pool.build_start()
  }

  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
    let ticket = match self.pending.remove(&request.id) {
      Some(ticket) => ticket,
      None => self.pool.submit(request.clone()),
    };
    ticket.wait()
  }

  fn prefetch(&mut self, request: &GenerateRequest) {
    if !self.pending.contains_key(&request.id) {
      let ticket = self.pool.submit(request.clone());
      self.pending.insert(request.id.clone(), ticket);
    }
  }

  fn invalidate(&mut self, file: &str) {
    self.pending.remove(file);
    self.pool.invalidate(file);
  }

  fn build_end(&mut self) -> DtsResult<()> {
    self.pending.clear();
    self.pool.build_end()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;
  use std::thread::ThreadId;

  struct Recording {
    threads: Arc<Mutex<Vec<(String, ThreadId)>>>,
    generated: Arc<AtomicUsize>,
  }

  impl DeclarationOracle for Recording {
    fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
      self.generated.fetch_add(1, Ordering::SeqCst);
      self
        .threads
        .lock()
        .push((request.id.clone(), std::thread::current().id()));
      Ok(GenerateOutput::verbatim(&format!("// {}", request.id)))
    }
  }

  fn pool_with(
    workers: usize,
    keep_alive: bool,
  ) -> (Arc<CheckerPool>, Arc<Mutex<Vec<(String, ThreadId)>>>, Arc<AtomicUsize>) {
    let threads = Arc::new(Mutex::new(Vec::new()));
    let generated = Arc::new(AtomicUsize::new(0));
    let (t, g) = (threads.clone(), generated.clone());
    let pool = CheckerPool::spawn(workers, None, keep_alive, move |_| {
      Ok(Box::new(Recording {
        threads: t.clone(),
        generated: g.clone(),
      }) as Box<dyn DeclarationOracle>)
    })
    .unwrap();
    (Arc::new(pool), threads, generated)
  }

  fn pool(workers: usize) -> (Arc<CheckerPool>, Arc<Mutex<Vec<(String, ThreadId)>>>, Arc<AtomicUsize>) {
    pool_with(workers, false)
  }

  #[test]
  fn files_of_one_project_share_a_worker() {
    let (pool, threads, _) = pool(4);
    let tickets: Vec<_> = ["/nowhere/p/a.ts", "/nowhere/p/b.ts", "/nowhere/p/c.ts"]
      .into_iter()
      .map(|id| pool.submit(GenerateRequest::new(id, "")))
      .collect();
    for ticket in tickets {
      ticket.wait().unwrap();
    }
    let threads = threads.lock();
    assert_eq!(threads.len(), 3);
    assert!(threads.iter().all(|(_, thread)| *thread == threads[0].1));
  }

  #[test]
  fn prefetched_files_are_generated_once() {
    let (pool, _, generated) = pool(2);
    let mut oracle = PooledOracle::new(pool.clone());
    let request = GenerateRequest::new("/nowhere/a.ts", "");
    oracle.prefetch(&request);
    oracle.prefetch(&request);
    assert_eq!(oracle.generate(&request).unwrap().code, "// /nowhere/a.ts");
    assert_eq!(generated.load(Ordering::SeqCst), 1);
    oracle.build_end().unwrap();
  }

  #[test]
  fn a_shut_down_pool_rejects_work() {
    let (pool, _, _) = pool(1);
    pool.shutdown();
    let err = pool.submit(GenerateRequest::new("/a.ts", "")).wait().unwrap_err();
    assert!(err.to_string().contains("shut down"), "{err}");
    assert!(pool.build_start().is_err());
  }

  #[test]
  fn workers_stop_at_build_end_and_restart_with_the_next_build() {
    let (pool, threads, _) = pool(2);
    pool.build_start().unwrap();
    pool.submit(GenerateRequest::new("/nowhere/a.ts", "")).wait().unwrap();
    pool.build_end().unwrap();
    assert_eq!(pool.workers(), 0);
    assert!(pool.submit(GenerateRequest::new("/nowhere/a.ts", "")).wait().is_err());

    pool.build_start().unwrap();
    assert_eq!(pool.workers(), 2);
    pool.submit(GenerateRequest::new("/nowhere/a.ts", "")).wait().unwrap();
    pool.build_end().unwrap();
    let threads = threads.lock();
    assert_ne!(threads[0].1, threads[1].1);
  }

  #[test]
  fn overlapping_builds_keep_the_workers() {
    let (pool, _, _) = pool(1);
    pool.build_start().unwrap();
    pool.build_start().unwrap();
    pool.build_end().unwrap();
    assert_eq!(pool.workers(), 1);
    pool.submit(GenerateRequest::new("/nowhere/a.ts", "")).wait().unwrap();
    pool.build_end().unwrap();
    assert_eq!(pool.workers(), 0);
  }

  #[test]
  fn incremental_pools_stay_warm_between_builds() {
    let (pool, threads, _) = pool_with(1, true);
    for _ in 0..2 {
      pool.build_start().unwrap();
      pool.submit(GenerateRequest::new("/nowhere/a.ts", "")).wait().unwrap();
      pool.build_end().unwrap();
      assert_eq!(pool.workers(), 1);
    }
    let threads = threads.lock();
    assert_eq!(threads[0].1, threads[1].1);
  }
}
