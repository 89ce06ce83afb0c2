//! NGAP signaling transport manager
//!
//! Opens one stream listener per configured NGAP address and tracks the
//! connected RAN peers. Accepted associations get a session task that relays
//! outbound notices and removes the peer from the pool on disconnect. NGAP
//! message processing itself happens elsewhere; this module only owns the
//! transport lifecycle and the unavailable-GUAMI notice sent during drain.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use nova5gc_sbi::Guami;

/// NGAP well-known port
pub const NGAP_PORT: u16 = 38412;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// Outbound notice to a RAN peer
#[derive(Debug)]
pub enum RanNotice {
    /// AMF status indication carrying the unavailable GUAMI list. `done`
    /// fires once the frame has been written to the peer; it is dropped
    /// unfired when the write fails.
    AmfUnavailable {
        frame: Vec<u8>,
        done: oneshot::Sender<()>,
    },
}

/// A connected RAN peer
#[derive(Debug)]
pub struct RanPeer {
    pub id: u64,
    pub addr: SocketAddr,
    notice_tx: mpsc::UnboundedSender<RanNotice>,
}

impl RanPeer {
    /// Queue a notice for delivery by the peer's session task
    pub fn send(&self, notice: RanNotice) -> bool {
        self.notice_tx.send(notice).is_ok()
    }
}

/// Connected RAN peers, keyed by peer id. Session tasks insert and remove
/// entries; the shutdown path takes a snapshot read.
pub type PeerPool = Arc<RwLock<HashMap<u64, RanPeer>>>;

pub fn new_peer_pool() -> PeerPool {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Snapshot the pool's notice senders. The read lock is released before the
/// caller sends anything, so session tasks are never blocked behind a
/// broadcast.
pub async fn snapshot_senders(pool: &PeerPool) -> Vec<(u64, mpsc::UnboundedSender<RanNotice>)> {
    pool.read()
        .await
        .values()
        .map(|peer| (peer.id, peer.notice_tx.clone()))
        .collect()
}

/// One bound NGAP listener with its accept-loop task
pub struct NgapListener {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl NgapListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// The set of NGAP listeners opened at startup. May be partial when some
/// configured addresses failed to bind.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<NgapListener>,
}

impl ListenerSet {
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(|l| l.local_addr).collect()
    }

    /// Close every listener exactly once. A close failure on one entry is
    /// logged and the remaining entries are still closed. Calling again
    /// after the set has been drained is a no-op.
    pub async fn close_all(&mut self) {
        for listener in self.listeners.drain(..) {
            let addr = listener.local_addr;
            if listener.shutdown_tx.send(()).is_err() {
                log::error!("NGAP listener on {addr} already gone");
                continue;
            }
            if let Err(e) = listener.handle.await {
                log::error!("NGAP listener task on {addr} ended abnormally: {e}");
            } else {
                log::info!("NGAP listener on {addr} closed");
            }
        }
    }
}

/// Open one listener per configured address. A bind failure on one address
/// is logged and the remaining addresses are still attempted, so the
/// returned set may be partial.
pub async fn open(addrs: &[String], port: u16, pool: PeerPool) -> ListenerSet {
    let mut set = ListenerSet::default();

    for addr in addrs {
        match open_listener(addr, port, pool.clone()).await {
            Ok(listener) => {
                log::info!("NGAP listener on {}", listener.local_addr);
                set.listeners.push(listener);
            }
            Err(e) => {
                log::error!("Failed to open NGAP listener on {addr}:{port}: {e}");
            }
        }
    }

    set
}

async fn open_listener(addr: &str, port: u16, pool: PeerPool) -> std::io::Result<NgapListener> {
    let bind_addr: SocketAddr = format!("{addr}:{port}")
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            register_peer(stream, peer_addr, pool.clone()).await;
                        }
                        Err(e) => {
                            log::warn!("NGAP accept error on {local_addr}: {e}");
                        }
                    }
                }
            }
        }
    });

    Ok(NgapListener {
        local_addr,
        shutdown_tx,
        handle,
    })
}

/// Register an accepted association in the pool and start its session task
async fn register_peer(stream: TcpStream, peer_addr: SocketAddr, pool: PeerPool) {
    let id = NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed);
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    pool.write().await.insert(
        id,
        RanPeer {
            id,
            addr: peer_addr,
            notice_tx,
        },
    );
    log::info!("RAN peer {id} connected from {peer_addr}");

    tokio::spawn(peer_session(id, stream, pool, notice_rx));
}

/// Per-peer session task: relays outbound notices and drops the peer from
/// the pool when the association ends. Inbound bytes are read off the wire
/// but handled by the signaling layer, not here.
async fn peer_session(
    id: u64,
    mut stream: TcpStream,
    pool: PeerPool,
    mut notice_rx: mpsc::UnboundedReceiver<RanNotice>,
) {
    let mut buf = [0u8; 4096];

    loop {
        tokio::select! {
            notice = notice_rx.recv() => {
                match notice {
                    Some(RanNotice::AmfUnavailable { frame, done }) => {
                        if let Err(e) = stream.write_all(&frame).await {
                            log::warn!("Failed to send status indication to peer {id}: {e}");
                            break;
                        }
                        let _ = done.send(());
                    }
                    None => break,
                }
            }
            read = stream.read(&mut buf) => {
                match read {
                    Ok(0) => break,
                    Ok(n) => {
                        log::trace!("Peer {id}: {n} bytes of signaling");
                    }
                    Err(e) => {
                        log::warn!("Peer {id} read error: {e}");
                        break;
                    }
                }
            }
        }
    }

    pool.write().await.remove(&id);
    log::info!("RAN peer {id} disconnected");
}

// ============================================================================
// AMF status indication
// ============================================================================

/// Encode a PLMN ID into its 3-byte BCD form. Digits that fail to parse
/// encode as filler (0xf).
fn encode_plmn_id(mcc: &str, mnc: &str) -> [u8; 3] {
    let digit = |s: &str, i: usize| -> u8 {
        s.chars()
            .nth(i)
            .and_then(|c| c.to_digit(10))
            .map(|d| d as u8)
            .unwrap_or(0xf)
    };

    let (m1, m2, m3) = (digit(mcc, 0), digit(mcc, 1), digit(mcc, 2));
    let (n1, n2) = (digit(mnc, 0), digit(mnc, 1));
    let n3 = if mnc.len() > 2 { digit(mnc, 2) } else { 0xf };

    [(m2 << 4) | m1, (n3 << 4) | m3, (n2 << 4) | n1]
}

/// Build the AMFStatusIndication frame (procedure code 1) carrying the
/// unavailable GUAMI list.
///
/// Framing: initiating-message tag, procedure code, ignore criticality, a
/// 16-bit big-endian payload length, then a 16-bit GUAMI count followed by
/// 6 bytes per GUAMI (BCD PLMN + AMF ID).
pub fn build_amf_status_indication(guami_list: &[Guami]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + guami_list.len() * 6);
    payload.extend_from_slice(&(guami_list.len() as u16).to_be_bytes());

    for guami in guami_list {
        payload.extend_from_slice(&encode_plmn_id(&guami.plmn_id.mcc, &guami.plmn_id.mnc));
        let amf_id = hex::decode(&guami.amf_id).unwrap_or_else(|_| {
            log::warn!("Invalid AMF ID '{}' in served GUAMI", guami.amf_id);
            vec![0, 0, 0]
        });
        payload.extend_from_slice(&amf_id);
    }

    let mut frame = Vec::with_capacity(5 + payload.len());
    frame.push(0x00); // initiating message
    frame.push(0x01); // procedure code: AMFStatusIndication
    frame.push(0x40); // criticality: ignore
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(&payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova5gc_sbi::PlmnId;
    use std::time::Duration;

    fn test_guami() -> Guami {
        Guami {
            plmn_id: PlmnId::new("208", "93"),
            amf_id: "cafe00".to_string(),
        }
    }

    async fn wait_for_peers(pool: &PeerPool, count: usize) {
        for _ in 0..100 {
            if pool.read().await.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pool never reached {count} peers");
    }

    #[test]
    fn test_encode_plmn_id_two_digit_mnc() {
        assert_eq!(encode_plmn_id("208", "93"), [0x02, 0xf8, 0x39]);
    }

    #[test]
    fn test_encode_plmn_id_three_digit_mnc() {
        assert_eq!(encode_plmn_id("310", "170"), [0x13, 0x00, 0x71]);
    }

    #[test]
    fn test_build_amf_status_indication() {
        let frame = build_amf_status_indication(&[test_guami()]);

        assert_eq!(&frame[..3], &[0x00, 0x01, 0x40]);
        assert_eq!(u16::from_be_bytes([frame[3], frame[4]]), 8);
        assert_eq!(u16::from_be_bytes([frame[5], frame[6]]), 1);
        assert_eq!(&frame[7..10], &[0x02, 0xf8, 0x39]);
        assert_eq!(&frame[10..13], &[0xca, 0xfe, 0x00]);
    }

    #[test]
    fn test_build_amf_status_indication_empty() {
        let frame = build_amf_status_indication(&[]);
        assert_eq!(frame.len(), 7);
        assert_eq!(u16::from_be_bytes([frame[5], frame[6]]), 0);
    }

    #[tokio::test]
    async fn test_open_partial_bind_failure() {
        let pool = new_peer_pool();
        let addrs = vec!["not-an-address".to_string(), "127.0.0.1".to_string()];

        let mut set = open(&addrs, 0, pool).await;
        assert_eq!(set.len(), 1);

        set.close_all().await;
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_peer_registered_and_dropped() {
        let pool = new_peer_pool();
        let addrs = vec!["127.0.0.1".to_string()];
        let mut set = open(&addrs, 0, pool.clone()).await;
        let addr = set.local_addrs()[0];

        let stream = TcpStream::connect(addr).await.unwrap();
        wait_for_peers(&pool, 1).await;

        drop(stream);
        wait_for_peers(&pool, 0).await;

        set.close_all().await;
    }

    #[tokio::test]
    async fn test_notice_reaches_peer() {
        let pool = new_peer_pool();
        let addrs = vec!["127.0.0.1".to_string()];
        let mut set = open(&addrs, 0, pool.clone()).await;
        let addr = set.local_addrs()[0];

        let mut stream = TcpStream::connect(addr).await.unwrap();
        wait_for_peers(&pool, 1).await;

        let frame = build_amf_status_indication(&[test_guami()]);
        let (done_tx, done_rx) = oneshot::channel();
        {
            let peers = pool.read().await;
            let peer = peers.values().next().unwrap();
            assert!(peer.send(RanNotice::AmfUnavailable {
                frame: frame.clone(),
                done: done_tx,
            }));
        }

        // The ack fires only after the frame hit the wire
        tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .unwrap()
            .unwrap();

        let mut received = vec![0u8; frame.len()];
        tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, frame);

        set.close_all().await;
    }

    #[tokio::test]
    async fn test_snapshot_sender_fails_after_peer_gone() {
        let pool = new_peer_pool();
        let addrs = vec!["127.0.0.1".to_string()];
        let mut set = open(&addrs, 0, pool.clone()).await;
        let addr = set.local_addrs()[0];

        let stream = TcpStream::connect(addr).await.unwrap();
        wait_for_peers(&pool, 1).await;
        let senders = snapshot_senders(&pool).await;
        assert_eq!(senders.len(), 1);

        drop(stream);
        wait_for_peers(&pool, 0).await;

        let (done_tx, _done_rx) = oneshot::channel();
        let (_, tx) = &senders[0];
        assert!(tx
            .send(RanNotice::AmfUnavailable {
                frame: Vec::new(),
                done: done_tx,
            })
            .is_err());

        set.close_all().await;
    }

    #[tokio::test]
    async fn test_close_all_is_idempotent() {
        let pool = new_peer_pool();
        let addrs = vec!["127.0.0.1".to_string()];
        let mut set = open(&addrs, 0, pool).await;
        assert_eq!(set.len(), 1);

        set.close_all().await;
        set.close_all().await;
        assert!(set.is_empty());
    }
}
