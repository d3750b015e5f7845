//! In-memory BLE central for host tests
//!
//! One [`MockPeripheral`] plays the remote hub. It records every write and
//! answers watchdog requests the way an SBrick does. Clients are handles
//! sharing state with the central, like the client pool of a real stack.

use std::cell::RefCell;
use std::rc::Rc;

use mtc_core::BleAddress;
use mtc_hal::{
    BleCentral, BleError, ConnectionParams, GattClient, RemoteCharacteristic, Uuid,
};
use mtc_protocol::command::{OP_GET_WATCHDOG_TIMEOUT, OP_SET_WATCHDOG_TIMEOUT};

use crate::sbrick::{CHARACTERISTIC_UUID, SERVICE_UUID};

struct PeripheralState {
    service: Uuid,
    characteristic: Uuid,
    writable: bool,
    accept_connect: bool,
    fail_writes: bool,
    /// Writes never complete
    stall_writes: bool,
    fail_reads: bool,
    watchdog_timeout: u8,
    readback_override: Option<u8>,
    /// Raw bytes answered to a watchdog request, overriding everything else
    raw_readback: Option<Vec<u8>>,
    /// Every write attempt, including failed ones
    attempts: usize,
    writes: Vec<Vec<u8>>,
    /// `refresh_services` flag of every connect attempt
    connects: Vec<bool>,
    disconnects: usize,
}

/// Remote hub shared by the mock central, its clients and the test
#[derive(Clone)]
pub struct MockPeripheral {
    state: Rc<RefCell<PeripheralState>>,
}

impl MockPeripheral {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PeripheralState {
                service: SERVICE_UUID,
                characteristic: CHARACTERISTIC_UUID,
                writable: true,
                accept_connect: true,
                fail_writes: false,
                stall_writes: false,
                fail_reads: false,
                watchdog_timeout: 0,
                readback_override: None,
                raw_readback: None,
                attempts: 0,
                writes: Vec::new(),
                connects: Vec::new(),
                disconnects: 0,
            })),
        }
    }

    pub fn set_service(&self, service: Uuid) {
        self.state.borrow_mut().service = service;
    }

    pub fn set_characteristic(&self, characteristic: Uuid) {
        self.state.borrow_mut().characteristic = characteristic;
    }

    pub fn set_writable(&self, writable: bool) {
        self.state.borrow_mut().writable = writable;
    }

    pub fn set_accept_connect(&self, accept: bool) {
        self.state.borrow_mut().accept_connect = accept;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn set_stall_writes(&self, stall: bool) {
        self.state.borrow_mut().stall_writes = stall;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn set_readback_override(&self, value: Option<u8>) {
        self.state.borrow_mut().readback_override = value;
    }

    pub fn set_raw_readback(&self, bytes: Option<Vec<u8>>) {
        self.state.borrow_mut().raw_readback = bytes;
    }

    pub fn watchdog_timeout(&self) -> u8 {
        self.state.borrow().watchdog_timeout
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().writes.clone()
    }

    pub fn write_attempts(&self) -> usize {
        self.state.borrow().attempts
    }

    pub fn connects(&self) -> Vec<bool> {
        self.state.borrow().connects.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.state.borrow().disconnects
    }

    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.attempts = 0;
        state.writes.clear();
        state.connects.clear();
        state.disconnects = 0;
    }
}

struct ClientState {
    id: usize,
    peer: Option<BleAddress>,
    connected: bool,
}

/// Client handle
#[derive(Clone)]
pub struct MockClient {
    state: Rc<RefCell<ClientState>>,
    peripheral: MockPeripheral,
}

impl MockClient {
    fn id(&self) -> usize {
        self.state.borrow().id
    }

    /// Simulate the peer dropping the link
    pub fn drop_link(&self) {
        self.state.borrow_mut().connected = false;
    }
}

impl GattClient for MockClient {
    type Characteristic = MockCharacteristic;

    fn peer_address(&self) -> Option<BleAddress> {
        self.state.borrow().peer
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    async fn connect(&mut self, address: BleAddress, refresh_services: bool) -> Result<(), BleError> {
        let mut peripheral = self.peripheral.state.borrow_mut();
        peripheral.connects.push(refresh_services);
        if !peripheral.accept_connect {
            return Err(BleError::ConnectFailed);
        }

        let mut state = self.state.borrow_mut();
        state.peer = Some(address);
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BleError> {
        self.peripheral.state.borrow_mut().disconnects += 1;
        self.state.borrow_mut().connected = false;
        Ok(())
    }

    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<MockCharacteristic, BleError> {
        if !self.is_connected() {
            return Err(BleError::NotConnected);
        }

        let peripheral = self.peripheral.state.borrow();
        if service != peripheral.service {
            return Err(BleError::ServiceNotFound);
        }
        if characteristic != peripheral.characteristic {
            return Err(BleError::CharacteristicNotFound);
        }

        Ok(MockCharacteristic {
            peripheral: self.peripheral.clone(),
            pending_read: None,
        })
    }
}

/// Remote control characteristic of the mock hub
pub struct MockCharacteristic {
    peripheral: MockPeripheral,
    pending_read: Option<Vec<u8>>,
}

impl RemoteCharacteristic for MockCharacteristic {
    fn can_write(&self) -> bool {
        self.peripheral.state.borrow().writable
    }

    async fn write(&mut self, data: &[u8], _with_response: bool) -> Result<(), BleError> {
        let stall = {
            let mut peripheral = self.peripheral.state.borrow_mut();
            peripheral.attempts += 1;
            peripheral.stall_writes
        };
        if stall {
            core::future::pending::<()>().await;
        }

        let mut peripheral = self.peripheral.state.borrow_mut();
        if peripheral.fail_writes || !peripheral.writable {
            return Err(BleError::WriteFailed);
        }

        peripheral.writes.push(data.to_vec());
        match data {
            [OP_SET_WATCHDOG_TIMEOUT, timeout] => peripheral.watchdog_timeout = *timeout,
            [OP_GET_WATCHDOG_TIMEOUT] => {
                let answer = match &peripheral.raw_readback {
                    Some(bytes) => bytes.clone(),
                    None => vec![peripheral
                        .readback_override
                        .unwrap_or(peripheral.watchdog_timeout)],
                };
                self.pending_read = Some(answer);
            }
            _ => {}
        }
        Ok(())
    }

    /// Reports the full answer length even when `buf` is shorter
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, BleError> {
        if self.peripheral.state.borrow().fail_reads {
            return Err(BleError::ReadFailed);
        }
        let answer = self.pending_read.take().ok_or(BleError::ReadFailed)?;
        let len = answer.len().min(buf.len());
        buf[..len].copy_from_slice(&answer[..len]);
        Ok(answer.len())
    }
}

/// Central with a bounded client pool
pub struct MockCentral {
    peripheral: MockPeripheral,
    clients: Vec<MockClient>,
    max_clients: usize,
    next_id: usize,
    created: usize,
    deleted: usize,
    last_params: Option<ConnectionParams>,
}

impl MockCentral {
    pub fn new(peripheral: MockPeripheral, max_clients: usize) -> Self {
        Self {
            peripheral,
            clients: Vec::new(),
            max_clients,
            next_id: 0,
            created: 0,
            deleted: 0,
            last_params: None,
        }
    }

    /// Occupy a slot with a client bound to some other peer
    pub fn add_foreign_client(&mut self, connected: bool) {
        let client = self.new_client();
        let mut state = client.state.borrow_mut();
        state.peer = Some(BleAddress::new([0xff; 6]));
        state.connected = connected;
        drop(state);
        self.clients.push(client);
    }

    /// Client bound to `address`, for simulating link loss
    pub fn client_for(&self, address: BleAddress) -> Option<&MockClient> {
        self.clients
            .iter()
            .find(|c| c.peer_address() == Some(address))
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn deleted(&self) -> usize {
        self.deleted
    }

    pub fn last_params(&self) -> Option<ConnectionParams> {
        self.last_params
    }

    fn new_client(&mut self) -> MockClient {
        self.next_id += 1;
        MockClient {
            state: Rc::new(RefCell::new(ClientState {
                id: self.next_id,
                peer: None,
                connected: false,
            })),
            peripheral: self.peripheral.clone(),
        }
    }
}

impl BleCentral for MockCentral {
    type Client = MockClient;

    fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn max_clients(&self) -> usize {
        self.max_clients
    }

    fn client_by_peer(&mut self, address: BleAddress) -> Option<MockClient> {
        self.client_for(address).cloned()
    }

    fn disconnected_client(&mut self) -> Option<MockClient> {
        self.clients.iter().find(|c| !c.is_connected()).cloned()
    }

    fn create_client(&mut self, params: ConnectionParams) -> Result<MockClient, BleError> {
        if self.clients.len() >= self.max_clients {
            return Err(BleError::NoResources);
        }
        let client = self.new_client();
        self.clients.push(client.clone());
        self.created += 1;
        self.last_params = Some(params);
        Ok(client)
    }

    fn delete_client(&mut self, client: MockClient) {
        let id = client.id();
        self.clients.retain(|c| c.id() != id);
        self.deleted += 1;
    }
}
