use crate::impl_prelude::*;
use prelude_plus::*;

/// Measures the GPU time taken by the commands issued between
/// [`Context::timer_query_begin`] and [`Context::timer_query_finish`].
#[derive(Debug)]
pub struct TimerQuery {
  header: ObjectHeader,
  finished: Cell<bool>,
}

impl_object!(TimerQuery, header);

impl Context {
  fn check_timer_queries_supported(&self) -> GlResult<()> {
    if !self.supports_timer_queries() {
      return Err(self.unsupported("Timer queries without GL_EXT_disjoint_timer_query"));
    }
    Ok(())
  }

  pub fn timer_query_allocate(&self) -> GlResult<Rc<TimerQuery>> {
    self.check_timer_queries_supported()?;
    let name = self.driver().gen_query();
    let query = Rc::new(TimerQuery {
      header: ObjectHeader::new(self.id(), ObjectKind::TimerQuery, name),
      finished: Cell::new(false),
    });
    debug!("allocated {}", query.key());
    self.checkpoint_allocation(query, Self::timer_query_delete)
  }

  /// Starts timing. Only one query may be running at a time.
  pub fn timer_query_begin(&self, query: &Rc<TimerQuery>) -> GlResult<()> {
    self.check_object(&**query)?;
    if let Some(running) = self.running_timer_query.bound() {
      return Err(GlError::Query(format!(
        "Cannot begin {} while {} is running",
        query.key(),
        running.key(),
      )));
    }
    self.driver().begin_time_elapsed(query.name());
    query.finished.set(false);
    self.running_timer_query.set(Some(Rc::clone(query)));
    trace!("begin {}", query.key());
    self.checkpoint()
  }

  pub fn timer_query_finish(&self, query: &TimerQuery) -> GlResult<()> {
    self.check_object(query)?;
    if !self.running_timer_query.is_bound(query) {
      return Err(GlError::Query(format!("{} is not running", query.key())));
    }
    self.driver().end_time_elapsed();
    self.running_timer_query.set(None);
    query.finished.set(true);
    trace!("finish {}", query.key());
    self.checkpoint()
  }

  fn check_timer_query_finished(&self, query: &TimerQuery) -> GlResult<()> {
    self.check_object(query)?;
    if !query.finished.get() {
      return Err(GlError::Query(format!("{} has not been finished", query.key())));
    }
    Ok(())
  }

  pub fn timer_query_result_is_available(&self, query: &TimerQuery) -> GlResult<bool> {
    self.check_timer_query_finished(query)?;
    Ok(self.driver().query_result_available(query.name()))
  }

  /// Blocks until the result is available.
  pub fn timer_query_result_nanos(&self, query: &TimerQuery) -> GlResult<u64> {
    self.check_timer_query_finished(query)?;
    let nanos = self.driver().query_result(query.name());
    self.checkpoint()?;
    Ok(nanos)
  }

  pub fn timer_query_delete(&self, query: &TimerQuery) -> GlResult<()> {
    self.check_object(query)?;
    debug!("delete {}", query.key());
    if self.running_timer_query.forget_if(query.key()) {
      self.driver().end_time_elapsed();
    }
    self.driver().delete_query(query.name());
    query.header.mark_deleted();
    self.checkpoint()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ContextConfig, FakeDriver, SharedContext};

  fn context(driver: FakeDriver) -> SharedContext {
    let config = ContextConfig { check_errors: true, ..Default::default() };
    Context::new(Box::new(driver), config).unwrap()
  }

  #[test]
  fn a_finished_query_reports_elapsed_time() {
    let ctx = context(FakeDriver::new(Profile::Gl33).with_elapsed_nanos(2_500));
    let query = ctx.timer_query_allocate().unwrap();
    ctx.timer_query_begin(&query).unwrap();
    ctx.timer_query_finish(&query).unwrap();
    assert!(ctx.timer_query_result_is_available(&query).unwrap());
    assert_eq!(ctx.timer_query_result_nanos(&query).unwrap(), 2_500);
  }

  #[test]
  fn misuse_is_reported() {
    let ctx = context(FakeDriver::new(Profile::Gl33));
    let a = ctx.timer_query_allocate().unwrap();
    let b = ctx.timer_query_allocate().unwrap();

    assert!(matches!(ctx.timer_query_finish(&a), Err(GlError::Query(_))));
    assert!(matches!(ctx.timer_query_result_nanos(&a), Err(GlError::Query(_))));
    ctx.timer_query_begin(&a).unwrap();
    assert!(matches!(ctx.timer_query_begin(&b), Err(GlError::Query(_))));
    assert!(matches!(ctx.timer_query_result_is_available(&a), Err(GlError::Query(_))));
    ctx.timer_query_finish(&a).unwrap();
    ctx.timer_query_begin(&b).unwrap();
  }

  #[test]
  fn gles2_needs_the_disjoint_timer_extension() {
    let ctx = context(FakeDriver::new(Profile::Gles2));
    assert!(matches!(ctx.timer_query_allocate(), Err(GlError::Unsupported(_))));

    let driver = FakeDriver::new(Profile::Gles2).with_extension("GL_EXT_disjoint_timer_query");
    let ctx = context(driver);
    ctx.timer_query_allocate().unwrap();
  }

  #[test]
  fn deleting_a_running_query_stops_it() {
    let ctx = context(FakeDriver::new(Profile::Gl33));
    let a = ctx.timer_query_allocate().unwrap();
    let b = ctx.timer_query_allocate().unwrap();
    ctx.timer_query_begin(&a).unwrap();
    ctx.timer_query_delete(&a).unwrap();
    ctx.timer_query_begin(&b).unwrap();
    assert!(matches!(ctx.timer_query_begin(&a), Err(GlError::Deleted(_))));
  }
}
