//! Background read of a whole document
//!
//! One worker thread holds the store connection for the whole read and sends
//! each finished group over a channel. The consumer hands the updates to a
//! [`StoreDelegate`] on its own thread, blocking or polling.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use rusqlite::Connection;
use tracing::{debug, warn};

use super::factory::StorageModelFactory;
use super::memory::SharedConnection;
use super::sqlite;
use crate::model::{DataSet, GeometryController, Layer, WindowSize};
use crate::{Error, Result};

/// One finished group of a background read, in read order
#[derive(Debug)]
pub enum StoreUpdate {
    TableNames(Vec<String>),
    WindowSize(WindowSize),
    Geometry(GeometryController),
    DataSets(Vec<DataSet>),
    Layers(Vec<Layer>),
    /// Always the last message
    Finished(Result<()>),
}

/// Receives the results of a background read
pub trait StoreDelegate {
    fn update_table_names(&mut self, names: Vec<String>);
    fn update_window_size(&mut self, size: WindowSize);
    fn update_geometry(&mut self, geometry: GeometryController);
    fn update_data_sets(&mut self, data_sets: Vec<DataSet>);
    fn update_layers(&mut self, layers: Vec<Layer>);
}

/// Classification of one optional read
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Ready(T),
    /// The singleton table holds no row
    Absent,
    Failed(Error),
}

pub fn classify<T>(result: Result<T>) -> ReadOutcome<T> {
    match result {
        Ok(value) => ReadOutcome::Ready(value),
        Err(e) if e.is_empty_result() => ReadOutcome::Absent,
        Err(e) => ReadOutcome::Failed(e),
    }
}

/// Consumer side of a background read
pub struct ReadSession {
    receiver: Receiver<StoreUpdate>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl ReadSession {
    /// Spawn the worker reading from `conn`
    pub fn spawn(conn: SharedConnection) -> Result<Self> {
        let (sender, receiver) = channel::unbounded();
        let handle = thread::Builder::new()
            .name("xrose-read".to_string())
            .spawn(move || {
                let result = match conn.lock() {
                    Ok(guard) => match guard.as_ref() {
                        Some(conn) => read_all(conn, &sender),
                        None => Err(Error::DatabaseUnavailable),
                    },
                    Err(_) => Err(Error::DatabaseUnavailable),
                };
                // The consumer may already be gone
                let _ = sender.send(StoreUpdate::Finished(result));
            })?;

        Ok(Self {
            receiver,
            handle: Some(handle),
            finished: false,
        })
    }

    /// Block until the read completes, handing every update to `delegate`
    pub fn dispatch(mut self, delegate: &mut impl StoreDelegate) -> Result<()> {
        loop {
            let update = match self.receiver.recv() {
                Ok(update) => update,
                Err(_) => {
                    self.join();
                    return Err(Error::ReadAborted);
                }
            };
            if let Some(result) = self.apply(update, delegate) {
                self.join();
                return result;
            }
        }
    }

    /// Hand every pending update to `delegate` without blocking.
    ///
    /// Returns the result once the read has completed, `None` while it is
    /// still running and after the result was returned.
    pub fn poll(&mut self, delegate: &mut impl StoreDelegate) -> Option<Result<()>> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(update) => {
                    if let Some(result) = self.apply(update, delegate) {
                        self.join();
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    self.join();
                    return Some(Err(Error::ReadAborted));
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn apply(&mut self, update: StoreUpdate, delegate: &mut impl StoreDelegate) -> Option<Result<()>> {
        match update {
            StoreUpdate::TableNames(names) => delegate.update_table_names(names),
            StoreUpdate::WindowSize(size) => delegate.update_window_size(size),
            StoreUpdate::Geometry(geometry) => delegate.update_geometry(geometry),
            StoreUpdate::DataSets(data_sets) => delegate.update_data_sets(data_sets),
            StoreUpdate::Layers(layers) => delegate.update_layers(layers),
            StoreUpdate::Finished(result) => {
                self.finished = true;
                return Some(result);
            }
        }
        None
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Background read worker panicked");
            }
        }
    }
}

fn read_all(conn: &Connection, sender: &Sender<StoreUpdate>) -> Result<()> {
    let mut factory = StorageModelFactory::new();
    let send = |update: StoreUpdate| {
        let _ = sender.send(update);
    };

    send(StoreUpdate::TableNames(sqlite::table_names(conn)?));

    match classify(sqlite::window_size(conn)) {
        ReadOutcome::Ready(size) => send(StoreUpdate::WindowSize(size)),
        ReadOutcome::Absent => warn!("No window size stored, keeping defaults"),
        ReadOutcome::Failed(e) => return Err(e),
    }

    match classify(sqlite::geometry_record(conn)) {
        ReadOutcome::Ready(record) => send(StoreUpdate::Geometry(factory.geometry_from(&record))),
        ReadOutcome::Absent => warn!("No geometry stored, keeping defaults"),
        ReadOutcome::Failed(e) => return Err(e),
    }

    let mut data_sets = Vec::new();
    for record in sqlite::data_set_records(conn)? {
        let mut data_set = factory.create_data_set(record);
        // Only an uncoercible value is local to its dataset
        match sqlite::data_set_values(conn, &data_set) {
            Ok(values) => data_set.values = values,
            Err(e @ Error::UnknownValueType { .. }) => {
                warn!("Dataset {} has no usable values: {}", data_set.name, e)
            }
            Err(e) => return Err(e),
        }
        data_sets.push(data_set);
    }
    send(StoreUpdate::DataSets(data_sets));

    factory.set_colors(sqlite::colors(conn)?);
    let layers = sqlite::read_layers(conn, &factory)?;
    send(StoreUpdate::Layers(layers));

    debug!("Background read complete");
    Ok(())
}
