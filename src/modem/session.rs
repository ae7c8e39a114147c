// src/modem/session.rs

use super::{AtModem, Completion};
use crate::common::{
    buffer::ReceiveBuffer,
    command::AtCommand,
    config::{LinkConfig, WeatherTarget},
    error::WxError,
    hal_traits::{SerialChannel, Timer},
    timing, CommandResult,
};
use crate::weather::{format_request, FieldMarker, WeatherFields, TIME_MARKERS, WEATHER_MARKERS};
use log::{debug, info, warn};

impl<IF> AtModem<IF>
where
    IF: SerialChannel + Timer,
{
    /// Checks that the module answers at all.
    pub fn check_alive<const N: usize>(
        &mut self,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<(), WxError<IF::Error>> {
        let timeout = self.config.attention_timeout;
        self.run_command(&AtCommand::Attention, timeout, rx)
    }

    /// Brings the module up as a station on the given access point.
    ///
    /// The liveness check and the join must succeed. Switching to station
    /// mode and reading back the address are best effort; their failures are
    /// only logged.
    pub fn join_network<const N: usize>(
        &mut self,
        ssid: &str,
        password: &str,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<(), WxError<IF::Error>> {
        let cfg = self.config;

        self.check_alive(rx)?;

        let mode = self.send_command(&AtCommand::StationMode, cfg.station_mode_timeout, rx)?;
        if !mode.is_matched() {
            warn!("wifi: station mode not confirmed ({:?}), continuing", mode);
        }

        info!("wifi: joining {:?}", ssid);
        self.run_command(
            &AtCommand::JoinAccessPoint { ssid, password },
            cfg.join_timeout,
            rx,
        )?;
        info!("wifi: connected");

        match self.send_command(&AtCommand::QueryAddress, cfg.query_address_timeout, rx)? {
            CommandResult::Matched => info!("wifi: {}", rx.as_str_lossy().trim()),
            other => warn!("wifi: address query failed ({:?})", other),
        }
        Ok(())
    }

    /// Requests `target` over a fresh TCP connection and extracts `markers`
    /// from the response.
    ///
    /// `rx` receives the command replies and then the payload; it has to hold
    /// the whole response for every field to be found.
    ///
    /// # Errors
    ///
    /// A request that cannot be formatted, a connection or send step that is
    /// not acknowledged, or a response with no bytes at all. A response that
    /// arrives but carries none of the markers is an empty `Ok`.
    pub fn fetch<const N: usize>(
        &mut self,
        target: &WeatherTarget<'_>,
        markers: &[FieldMarker],
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<WeatherFields, WxError<IF::Error>> {
        let cfg = self.config;
        let request = format_request(target).map_err(|e| {
            warn!("http: cannot build request for {}: {}", target.host, e);
            WxError::from(e)
        })?;

        debug!("http: connecting to {}:{}", target.host, target.port);
        self.run_command(
            &AtCommand::OpenTcp { host: target.host, port: target.port },
            cfg.open_tcp_timeout,
            rx,
        )?;

        if let Err(e) = self.transmit_request(request.as_bytes(), &cfg, rx) {
            warn!("http: request not sent: {:?}", e);
            self.close_connection(&cfg, rx);
            return Err(e);
        }

        let report = self.receive_payload(rx, &cfg.payload);
        let fields = WeatherFields::extract(rx.as_bytes(), markers);

        if report.completion == Completion::TerminalMarker {
            debug!("http: remote closed the connection");
        } else {
            self.close_connection(&cfg, rx);
        }

        if report.is_empty() {
            return Err(WxError::Timeout);
        }
        info!("http: {} fields from {}", fields.len(), target.host);
        Ok(fields)
    }

    /// [`fetch`](Self::fetch) with the weather line markers.
    pub fn fetch_weather<const N: usize>(
        &mut self,
        target: &WeatherTarget<'_>,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<WeatherFields, WxError<IF::Error>> {
        self.fetch(target, WEATHER_MARKERS, rx)
    }

    /// [`fetch`](Self::fetch) with the time-service marker.
    pub fn fetch_time<const N: usize>(
        &mut self,
        target: &WeatherTarget<'_>,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<WeatherFields, WxError<IF::Error>> {
        self.fetch(target, TIME_MARKERS, rx)
    }

    fn transmit_request<const N: usize>(
        &mut self,
        request: &[u8],
        cfg: &LinkConfig,
        rx: &mut ReceiveBuffer<N>,
    ) -> Result<(), WxError<IF::Error>> {
        self.run_command(&AtCommand::SendLength(request.len()), cfg.send_prompt_timeout, rx)?;
        self.send_bytes(request, timing::PAYLOAD_WRITE_TIMEOUT)?;
        self.await_response("SEND OK\r\n", cfg.send_prompt_timeout, rx)
            .require(rx)
    }

    fn close_connection<const N: usize>(&mut self, cfg: &LinkConfig, rx: &mut ReceiveBuffer<N>) {
        match self.send_command(&AtCommand::Close, cfg.close_timeout, rx) {
            Ok(CommandResult::Matched) => debug!("http: connection closed"),
            Ok(other) => warn!("http: close not acknowledged ({:?})", other),
            Err(e) => warn!("http: close failed: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockInterface;
    use super::*;
    use crate::common::{command::CommandFormatError, PAYLOAD_BUFFER_SIZE};
    use crate::weather::Field;

    type Rx = ReceiveBuffer<PAYLOAD_BUFFER_SIZE>;

    const WEATHER_REPLY: &[u8] = b"\r\nRecv 135 bytes\r\n\r\nSEND OK\r\n\r\n+IPD,170:HTTP/1.1 200 OK\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\r\n\
        loc=Beijing;cond=Sunny;temp=+18\xc2\xb0C;hum=23%;wind=\xe2\x86\x9711km/h\r\nCLOSED\r\n";

    fn stage_join(mock_if: &mut MockInterface) {
        mock_if.stage_reply(2, b"AT\r\r\n\r\nOK\r\n");
        mock_if.stage_reply(2, b"AT+CWMODE=1\r\r\n\r\nOK\r\n");
        mock_if.stage_reply(
            3_000,
            b"AT+CWJAP=\"home\",\"secret\"\r\r\nWIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n",
        );
        mock_if.stage_reply(5, b"AT+CIFSR\r\r\n+CIFSR:STAIP,\"192.168.1.23\"\r\n\r\nOK\r\n");
    }

    fn stage_fetch_prelude(mock_if: &mut MockInterface) {
        mock_if.stage_reply(200, b"AT+CIPSTART=\"TCP\",\"wttr.in\",80\r\r\nCONNECT\r\n\r\nOK\r\n");
        mock_if.stage_reply(5, b"AT+CIPSEND=135\r\r\n\r\nOK\r\n> ");
    }

    #[test]
    fn test_join_network_sequence() {
        let mut mock_if = MockInterface::new();
        stage_join(&mut mock_if);
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        modem.join_network("home", "secret", &mut rx).unwrap();

        let iface = modem.release();
        assert_eq!(iface.messages().len(), 4);
        assert_eq!(iface.message_str(0), "AT\r\n");
        assert_eq!(iface.message_str(1), "AT+CWMODE=1\r\n");
        assert_eq!(iface.message_str(2), "AT+CWJAP=\"home\",\"secret\"\r\n");
        assert_eq!(iface.message_str(3), "AT+CIFSR\r\n");
    }

    #[test]
    fn test_join_stops_when_module_is_silent() {
        let mut mock_if = MockInterface::new();
        mock_if.stage_silence();
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        assert_eq!(modem.join_network("home", "secret", &mut rx), Err(WxError::Timeout));
        assert_eq!(modem.release().messages().len(), 1);
    }

    #[test]
    fn test_join_tolerates_unconfirmed_station_mode() {
        let mut mock_if = MockInterface::new();
        mock_if.stage_reply(2, b"OK\r\n");
        mock_if.stage_reply(2, b"ERROR\r\n");
        mock_if.stage_reply(1_000, b"WIFI GOT IP\r\n");
        mock_if.stage_silence();
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        // Neither the mode switch nor the address query is required
        assert_eq!(modem.join_network("home", "secret", &mut rx), Ok(()));
    }

    #[test]
    fn test_join_failure_is_no_match() {
        let mut mock_if = MockInterface::new();
        mock_if.stage_reply(2, b"OK\r\n");
        mock_if.stage_reply(2, b"OK\r\n");
        mock_if.stage_reply(5_000, b"+CWJAP:1\r\n\r\nFAIL\r\n");
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        assert_eq!(modem.join_network("home", "wrong", &mut rx), Err(WxError::NoMatch));
        assert_eq!(modem.release().messages().len(), 3);
    }

    #[test]
    fn test_fetch_weather_remote_close() {
        let mut mock_if = MockInterface::new();
        stage_fetch_prelude(&mut mock_if);
        mock_if.stage_reply(50, WEATHER_REPLY);
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        let fields = modem.fetch_weather(&WeatherTarget::default(), &mut rx).unwrap();

        assert_eq!(fields.get(Field::Location), Some("Beijing"));
        assert_eq!(fields.get(Field::Condition), Some("Sunny"));
        assert_eq!(fields.temperature_celsius(), Some(18));
        assert_eq!(fields.humidity_percent(), Some(23));
        assert_eq!(fields.get(Field::Wind), Some("↗11km/h"));

        let iface = modem.release();
        // Remote closed, so no CIPCLOSE
        assert_eq!(iface.messages().len(), 3);
        assert_eq!(iface.message_str(0), "AT+CIPSTART=\"TCP\",\"wttr.in\",80\r\n");
        let request = format_request(&WeatherTarget::default()).unwrap();
        assert_eq!(iface.message_str(1), "AT+CIPSEND=135\r\n");
        assert_eq!(request.len(), 135);
        assert_eq!(iface.message_str(2), request.as_str());
    }

    #[test]
    fn test_fetch_closes_when_payload_ends_in_silence() {
        let mut mock_if = MockInterface::new();
        stage_fetch_prelude(&mut mock_if);
        mock_if.stage_reply(
            50,
            b"\r\nSEND OK\r\n\r\n+IPD,40:HTTP/1.1 200 OK\r\n\r\nloc=Oslo;temp=-4\xc2\xb0C\r\n",
        );
        mock_if.stage_reply(5, b"AT+CIPCLOSE\r\r\nCLOSED\r\n\r\nOK\r\n");
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        let fields = modem.fetch_weather(&WeatherTarget::default(), &mut rx).unwrap();

        assert_eq!(fields.get(Field::Location), Some("Oslo"));
        assert_eq!(fields.temperature_celsius(), Some(-4));
        let iface = modem.release();
        assert_eq!(iface.messages().len(), 4);
        assert_eq!(iface.message_str(3), "AT+CIPCLOSE\r\n");
    }

    #[test]
    fn test_fetch_connect_error() {
        let mut mock_if = MockInterface::new();
        mock_if.stage_reply(100, b"AT+CIPSTART=\"TCP\",\"wttr.in\",80\r\r\nDNS Fail\r\nERROR\r\n");
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        assert_eq!(
            modem.fetch_weather(&WeatherTarget::default(), &mut rx),
            Err(WxError::NoMatch)
        );
        assert_eq!(modem.release().messages().len(), 1);
    }

    #[test]
    fn test_fetch_without_response_is_timeout() {
        let mut mock_if = MockInterface::new();
        stage_fetch_prelude(&mut mock_if);
        mock_if.stage_reply(50, b"\r\nSEND OK\r\n");
        mock_if.stage_reply(5, b"OK\r\n");
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        assert_eq!(
            modem.fetch_weather(&WeatherTarget::default(), &mut rx),
            Err(WxError::Timeout)
        );
        // Connection is still torn down
        let iface = modem.release();
        assert_eq!(iface.message_str(3), "AT+CIPCLOSE\r\n");
    }

    #[test]
    fn test_fetch_send_prompt_missing_closes_connection() {
        let mut mock_if = MockInterface::new();
        mock_if.stage_reply(100, b"CONNECT\r\n\r\nOK\r\n");
        mock_if.stage_reply(5, b"link is not valid\r\n\r\nERROR\r\n");
        mock_if.stage_reply(5, b"OK\r\n");
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        assert_eq!(
            modem.fetch_weather(&WeatherTarget::default(), &mut rx),
            Err(WxError::NoMatch)
        );
        let iface = modem.release();
        assert_eq!(iface.messages().len(), 3);
        assert_eq!(iface.message_str(2), "AT+CIPCLOSE\r\n");
    }

    #[test]
    fn test_fetch_rejects_bad_target_before_io() {
        let mut modem = AtModem::new(MockInterface::new());
        let mut rx = Rx::new();
        let target = WeatherTarget { path: "", ..WeatherTarget::default() };

        assert_eq!(
            modem.fetch_weather(&target, &mut rx),
            Err(WxError::CommandFormat(CommandFormatError::Empty))
        );
        assert_eq!(modem.release().write_calls, 0);
    }

    #[test]
    fn test_fetch_time() {
        let mut mock_if = MockInterface::new();
        mock_if.stage_reply(100, b"CONNECT\r\n\r\nOK\r\n");
        mock_if.stage_reply(5, b"OK\r\n> ");
        mock_if.stage_reply(
            80,
            b"SEND OK\r\n\r\n+IPD,120:HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n\
              {\"datetime\":\"2025-03-14T09:26:53.589+08:00\",\"timezone\":\"Asia/Shanghai\"}CLOSED\r\n",
        );
        let mut modem = AtModem::new(mock_if);
        let mut rx = Rx::new();

        let target = WeatherTarget::time_api("/api/timezone/Asia/Shanghai");
        let fields = modem.fetch_time(&target, &mut rx).unwrap();
        assert_eq!(fields.get(Field::DateTime), Some("2025-03-14T09:26:53.589+08:00"));
        assert_eq!(fields.len(), 1);
    }
}
