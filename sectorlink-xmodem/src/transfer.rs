//! File-level transfer commands
//!
//! These are what the command line calls for `rx <file>` and `sx <file>`:
//! open the file, run the protocol, and close the file on every exit path
//! before returning.

use sectorlink_hal::{BlockStorage, ByteStream};

use crate::config::XmodemConfig;
use crate::error::{TransferError, TransferOutcome};
use crate::receiver::Receiver;
use crate::session::{Role, Session};
use crate::transmitter::Transmitter;

/// Receive a file from the peer and store it as `name`
///
/// The file must not exist yet. Returns the number of bytes stored, which
/// includes fill bytes padding the final packet.
pub fn receive_file<S, B>(
    stream: S,
    storage: &mut B,
    name: &str,
    config: &XmodemConfig,
) -> TransferOutcome<B::Error>
where
    S: ByteStream,
    B: BlockStorage,
{
    let mut session = match Session::open(storage, name, Role::Receiver) {
        Ok(session) => session,
        Err(e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Cannot create receive file \"{}\"", name);
            return Err(e);
        }
    };

    let outcome = Receiver::new(stream, *config).run(&mut session);
    finish(session, outcome)
}

/// Send the stored file `name` to the peer
///
/// Returns the number of file bytes sent, not counting padding.
pub fn send_file<S, B>(
    stream: S,
    storage: &mut B,
    name: &str,
    config: &XmodemConfig,
) -> TransferOutcome<B::Error>
where
    S: ByteStream,
    B: BlockStorage,
{
    let mut session = match Session::open(storage, name, Role::Sender) {
        Ok(session) => session,
        Err(e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Cannot open transmit file \"{}\"", name);
            return Err(e);
        }
    };

    let outcome = Transmitter::new(stream, *config).run(&mut session);
    finish(session, outcome)
}

/// Close the session and merge the close result into the outcome
///
/// A failed close only surfaces if the transfer itself succeeded; otherwise
/// the transfer error is the more useful report.
fn finish<B: BlockStorage>(
    session: Session<'_, B>,
    outcome: TransferOutcome<B::Error>,
) -> TransferOutcome<B::Error> {
    #[cfg(feature = "defmt")]
    let role = session.role();

    let closed = session.close();
    let outcome = match (outcome, closed) {
        (Ok(_), Err(e)) => Err(TransferError::Io(e)),
        (outcome, _) => outcome,
    };

    #[cfg(feature = "defmt")]
    match &outcome {
        Ok(bytes) => defmt::info!("XMODEM {:?} finished: {} bytes", role, bytes),
        Err(e) => defmt::warn!("XMODEM {:?} failed: status {}", role, e.code()),
    }

    outcome
}
