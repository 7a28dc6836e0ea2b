//! End-to-end scenario tests driving a real [`GameService`] through the
//! full protocol stack with in-process clients. No sockets: datagrams are
//! carried by hand between client-side message streams and the service.

mod harness;
mod scenarios;
