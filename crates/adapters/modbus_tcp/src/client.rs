//! Modbus TCP connector and client.

use std::time::Duration;

use rmodbus::client::ModbusRequest;
use rmodbus::{ModbusProto, guess_response_frame_len};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use gridcharge_app::ports::{DeviceClient, DeviceConnector};
use gridcharge_domain::error::DeviceError;

use crate::error::ModbusError;

/// Leading bytes of a response read before the rest: the MBAP header up to
/// and including its length field, which is all [`guess_response_frame_len`]
/// needs to work out the full frame length.
const HEADER_LEN: usize = 6;

/// Where and how to reach the inverter.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Applies to the connect and to every request/response exchange.
    pub timeout: Duration,
}

impl Config {
    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Opens a fresh TCP connection per command.
#[derive(Debug, Clone)]
pub struct ModbusTcpConnector {
    config: Config,
}

impl ModbusTcpConnector {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl DeviceConnector for ModbusTcpConnector {
    type Client = ModbusTcpClient;

    async fn connect(&self) -> Result<ModbusTcpClient, DeviceError> {
        let target = self.config.target();
        let connect = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let stream = match tokio::time::timeout(self.config.timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Err(DeviceError::Connect {
                    target,
                    source: Box::new(ModbusError::Io(err)),
                });
            }
            Err(_) => {
                return Err(DeviceError::Connect {
                    target,
                    source: Box::new(ModbusError::Timeout(self.config.timeout)),
                });
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(error = %err, "unable to disable nagle");
        }
        tracing::debug!(%target, "connected to inverter");
        Ok(ModbusTcpClient {
            stream,
            unit_id: self.config.unit_id,
            timeout: self.config.timeout,
        })
    }
}

/// A single open Modbus TCP session.
pub struct ModbusTcpClient {
    stream: TcpStream,
    unit_id: u8,
    timeout: Duration,
}

impl ModbusTcpClient {
    /// Send `request` and wait for the complete response frame.
    async fn transact(&mut self, request: &[u8]) -> Result<Vec<u8>, ModbusError> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.exchange(request))
            .await
            .map_err(|_| ModbusError::Timeout(timeout))?
    }

    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ModbusError> {
        self.stream.write_all(request).await?;

        let mut header = [0u8; HEADER_LEN];
        read_exact(&mut self.stream, &mut header).await?;
        let len = usize::from(
            guess_response_frame_len(&header, ModbusProto::TcpUdp).map_err(ModbusError::frame)?,
        );

        let mut response = Vec::with_capacity(len);
        response.extend_from_slice(&header);
        if len > HEADER_LEN {
            let mut rest = vec![0u8; len - HEADER_LEN];
            read_exact(&mut self.stream, &mut rest).await?;
            response.extend_from_slice(&rest);
        }
        Ok(response)
    }

    async fn read_holding(&mut self, register: u16) -> Result<u16, ModbusError> {
        let mut mreq = ModbusRequest::new(self.unit_id, ModbusProto::TcpUdp);
        let mut request: Vec<u8> = Vec::new();
        mreq.generate_get_holdings(register, 1, &mut request)
            .map_err(ModbusError::frame)?;

        let response = self.transact(&request).await?;

        let mut data: Vec<u16> = Vec::new();
        mreq.parse_u16(&response, &mut data)
            .map_err(ModbusError::frame)?;
        data.first()
            .copied()
            .ok_or_else(|| ModbusError::Frame("empty register payload".to_string()))
    }

    async fn write_holding(&mut self, register: u16, value: u16) -> Result<(), ModbusError> {
        let mut mreq = ModbusRequest::new(self.unit_id, ModbusProto::TcpUdp);
        let mut request: Vec<u8> = Vec::new();
        mreq.generate_set_holding(register, value, &mut request)
            .map_err(ModbusError::frame)?;

        let response = self.transact(&request).await?;
        mreq.parse_ok(&response).map_err(ModbusError::frame)
    }
}

impl DeviceClient for ModbusTcpClient {
    async fn read_register(&mut self, register: u16) -> Result<u16, DeviceError> {
        self.read_holding(register)
            .await
            .map_err(|err| err.on_register(register))
    }

    async fn write_register(&mut self, register: u16, value: u16) -> Result<(), DeviceError> {
        self.write_holding(register, value)
            .await
            .map_err(|err| err.on_register(register))
    }

    async fn close(mut self) {
        if let Err(err) = self.stream.shutdown().await {
            tracing::debug!(error = %err, "error while closing inverter connection");
        }
    }
}

async fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), ModbusError> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(ModbusError::Closed),
        Err(err) => Err(err.into()),
    }
}
