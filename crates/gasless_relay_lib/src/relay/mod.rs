mod process;
mod recover;
mod request;

pub use process::{OrderProgress, RelayService, RelayStep};
pub use recover::recover_orders;
pub use request::{PermitSignature, TransferRequest, ValidatedTransfer};

use crate::error::RelayError;
use crate::queue::{JobHandler, QueueMessage};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

impl JobHandler for RelayService {
    fn execute<'a>(&'a self, message: &'a QueueMessage) -> BoxFuture<'a, Result<(), RelayError>> {
        self.handle(&message.payload).boxed()
    }
}
