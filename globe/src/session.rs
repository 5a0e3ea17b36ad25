//! Lifecycle of a pipeline run: catalog in, tracked objects registered with a frame driver

use crate::{
    config::ObjectFilter,
    constellation::{Constellation, ConstellationConfig, FrameReport},
    driver::{FrameDriver, FrameEnvironment, RegistrationId},
    propagation::Propagator,
    publish::MarkerSink,
    tracking::MarkerHandle,
    FrameComponent,
};
use std::{
    cell::{Ref, RefCell},
    fs,
    ops::ControlFlow,
    path::{Path, PathBuf},
    rc::Rc,
};
use tlecatalog::{Catalog, Discarded, ParseOptions};
use tletypes::prelude::OrbitalRecord;
use tracing::{info, warn};

#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub parse: ParseOptions,
    pub constellation: ConstellationConfig,
    pub filter: ObjectFilter,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to read catalog '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct SessionState<P: Propagator, S> {
    constellation: Constellation<P>,
    sink: S,
}

impl<P: Propagator, S: MarkerSink> SessionState<P, S> {
    fn step(&mut self, env: &FrameEnvironment<'_>) {
        let SessionState {
            constellation,
            sink,
        } = self;
        constellation.step(env, sink);
    }
}

/// A running pipeline. Stopping, or dropping, the session removes its markers
/// and detaches it from the frame driver.
pub struct Session<P: Propagator, S: MarkerSink> {
    state: Rc<RefCell<SessionState<P, S>>>,
    registration: Option<RegistrationId>,
    filter: ObjectFilter,
    discarded: Vec<Discarded>,
}

impl<P, S> Session<P, S>
where
    P: Propagator + 'static,
    P::Prepared: 'static,
    S: MarkerSink + 'static,
{
    pub fn start(
        catalog_text: &str,
        options: SessionOptions,
        propagator: P,
        sink: S,
        driver: &mut FrameDriver,
    ) -> Self {
        let catalog = Catalog::parse(catalog_text, options.parse);
        Self::start_with_catalog(catalog, options, propagator, sink, driver)
    }

    pub fn start_from_path<Q: AsRef<Path>>(
        path: Q,
        options: SessionOptions,
        propagator: P,
        sink: S,
        driver: &mut FrameDriver,
    ) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_owned(),
            source,
        })?;
        info!(path = %path.display(), "Catalog loaded");
        Ok(Self::start(&text, options, propagator, sink, driver))
    }

    pub fn start_with_catalog(
        catalog: Catalog,
        options: SessionOptions,
        propagator: P,
        mut sink: S,
        driver: &mut FrameDriver,
    ) -> Self {
        let SessionOptions {
            constellation: constellation_config,
            filter,
            ..
        } = options;

        let mut constellation = Constellation::new(propagator, constellation_config);
        let catalog_len = catalog.len();
        constellation.admit_all(catalog.records.into_iter().filter(|r| filter.admits(r)));
        if constellation.is_empty() {
            warn!(
                records = catalog_len,
                "Session started with no objects to track"
            );
        }
        constellation.announce(&mut sink);

        info!(
            layout = ?catalog.layout,
            objects = constellation.len(),
            discarded = catalog.discarded.len(),
            "Session started"
        );

        let state = Rc::new(RefCell::new(SessionState {
            constellation,
            sink,
        }));
        let weak = Rc::downgrade(&state);
        let registration = driver.register(Box::new(move |env: &FrameEnvironment| {
            match weak.upgrade() {
                Some(state) => {
                    state.borrow_mut().step(env);
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }
        }));

        Session {
            state,
            registration: Some(registration),
            filter,
            discarded: catalog.discarded,
        }
    }
}

impl<P: Propagator, S: MarkerSink> Session<P, S> {
    pub fn stop(&mut self, driver: &mut FrameDriver) {
        if let Some(id) = self.registration.take() {
            driver.deregister(id);
            self.release();
        }
    }

    pub fn is_running(&self) -> bool {
        self.registration.is_some()
    }

    /// Replace the tracked objects with the records of a new catalog
    pub fn reload(&mut self, catalog: Catalog) -> Vec<MarkerHandle> {
        let filter = &self.filter;
        let records = catalog.records.into_iter().filter(|r| filter.admits(r));
        let mut state = self.state.borrow_mut();
        let SessionState {
            constellation,
            sink,
        } = &mut *state;
        let handles = constellation.reload(records, sink);
        self.discarded = catalog.discarded;
        handles
    }

    pub fn remove(&mut self, handle: MarkerHandle) -> Option<OrbitalRecord> {
        let mut state = self.state.borrow_mut();
        let SessionState {
            constellation,
            sink,
        } = &mut *state;
        constellation.remove(handle, sink)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().constellation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_report(&self) -> FrameReport {
        self.state.borrow().constellation.last_report()
    }

    /// Catalog entries dropped while loading the current catalog
    pub fn discarded(&self) -> &[Discarded] {
        &self.discarded
    }

    pub fn constellation(&self) -> Ref<'_, Constellation<P>> {
        Ref::map(self.state.borrow(), |s| &s.constellation)
    }

    pub fn sink(&self) -> Ref<'_, S> {
        Ref::map(self.state.borrow(), |s| &s.sink)
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        let handles = state.constellation.clear();
        if !handles.is_empty() {
            state.sink.remove_markers(&handles);
        }
        info!(objects = handles.len(), "Session stopped");
    }
}

impl<P: Propagator, S: MarkerSink> Drop for Session<P, S> {
    fn drop(&mut self) {
        if self.registration.take().is_some() {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::propagation::Sgp4Propagator;
    use crate::publish::RecordingSink;
    use crate::units::Time;
    use indoc::indoc;

    const CATALOG: &str = indoc! {"
        ISS (ZARYA)
        1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
        2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537

        ISS SHADOW
        1 25545U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2928
        2 25545  51.6416 127.4627 0006703 130.5360 325.0288 15.72125391563535

        DECAYED
        1 99999U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
    "};

    fn clock() -> ManualClock {
        ManualClock::new("2008-09-20T13:00:00Z".parse().unwrap())
    }

    fn start(
        text: &str,
        options: SessionOptions,
        driver: &mut FrameDriver,
    ) -> Session<Sgp4Propagator, RecordingSink> {
        Session::start(text, options, Sgp4Propagator, RecordingSink::new(), driver)
    }

    #[test]
    fn start_announces_and_ticks() {
        let mut driver = FrameDriver::new(60.0);
        let session = start(CATALOG, SessionOptions::default(), &mut driver);
        assert!(session.is_running());
        assert_eq!(session.len(), 2);
        assert_eq!(session.discarded().len(), 1);
        assert_eq!(session.discarded()[0].name, "DECAYED");
        assert_eq!(session.sink().len(), 2);
        assert_eq!(driver.registered(), 1);

        let clock = clock();
        driver.tick(&clock);
        clock.advance(Time::from_secs(1.0));
        driver.tick(&clock);

        assert_eq!(session.last_report().updated, 2);
        let sink = session.sink();
        assert_eq!(sink.frames, 2);
        assert_eq!(sink.moves, 4);
        assert!(sink.markers().all(|m| m.position.is_some()));
    }

    #[test]
    fn stop_deregisters_and_removes_markers() {
        let mut driver = FrameDriver::new(60.0);
        let mut session = start(CATALOG, SessionOptions::default(), &mut driver);
        let clock = clock();
        driver.tick(&clock);

        session.stop(&mut driver);
        assert!(!session.is_running());
        assert_eq!(driver.registered(), 0);
        assert!(session.is_empty());
        assert!(session.sink().is_empty());
        assert_eq!(session.sink().removed, 2);

        driver.tick(&clock);
        assert_eq!(session.sink().frames, 1);

        // Idempotent
        session.stop(&mut driver);
        assert_eq!(session.sink().removed, 2);
    }

    #[test]
    fn dropped_session_detaches_on_next_tick() {
        let mut driver = FrameDriver::new(60.0);
        let session = start(CATALOG, SessionOptions::default(), &mut driver);
        drop(session);
        assert_eq!(driver.registered(), 1);
        driver.tick(&clock());
        assert_eq!(driver.registered(), 0);
    }

    #[test]
    fn empty_catalog_runs_with_no_objects() {
        let mut driver = FrameDriver::new(60.0);
        let session = start("", SessionOptions::default(), &mut driver);
        assert!(session.is_empty());
        assert!(session.is_running());
        driver.tick(&clock());
        assert_eq!(session.last_report(), FrameReport::default());
        assert_eq!(session.sink().frames, 1);
    }

    #[test]
    fn object_filter_applies_on_start_and_reload() {
        let cfg = Config::from_str_checked("[[object]]\nid = 25545\n").unwrap();
        let mut driver = FrameDriver::new(60.0);
        let mut session = start(CATALOG, cfg.session_options().unwrap(), &mut driver);
        assert_eq!(session.len(), 1);
        assert_eq!(session.constellation().tracked()[0].record().name, "ISS SHADOW");

        let handles = session.reload(Catalog::parse(CATALOG, ParseOptions::default()));
        assert_eq!(handles.len(), 1);
        assert_eq!(session.sink().len(), 1);
        assert!(session.sink().marker(handles[0]).is_some());
    }

    #[test]
    fn remove_single_object() {
        let mut driver = FrameDriver::new(60.0);
        let mut session = start(CATALOG, SessionOptions::default(), &mut driver);
        let handle = session.constellation().tracked()[0].handle();
        let record = session.remove(handle).unwrap();
        assert_eq!(record.name, "ISS (ZARYA)");
        assert!(session.remove(handle).is_none());
        assert_eq!(session.len(), 1);
        assert!(session.sink().marker(handle).is_none());
        assert_eq!(session.sink().removed, 1);
    }

    #[test]
    fn missing_catalog_file() {
        let mut driver = FrameDriver::new(60.0);
        let res = Session::start_from_path(
            "/nonexistent/catalog.txt",
            SessionOptions::default(),
            Sgp4Propagator,
            RecordingSink::new(),
            &mut driver,
        );
        assert!(matches!(res, Err(SessionError::Io { .. })));
        assert_eq!(driver.registered(), 0);
    }
}
