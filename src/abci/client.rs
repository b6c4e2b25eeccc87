// Local client - In-process transport to a shared application
use super::*;
use crate::types::Height;

/// Produces clients bound to one application instance
#[derive(Clone)]
pub struct LocalClientCreator {
    app: SharedApplication,
}

impl LocalClientCreator {
    pub fn new(app: SharedApplication) -> Self {
        Self { app }
    }

    pub fn new_client(&self) -> LocalClient {
        LocalClient {
            app: Arc::clone(&self.app),
        }
    }
}

/// Client serializing every call through the application lock
#[derive(Clone)]
pub struct LocalClient {
    app: SharedApplication,
}

impl LocalClient {
    pub fn info(&self) -> ResponseInfo {
        self.app.lock().info()
    }

    pub fn init_chain(&self, request: RequestInitChain) -> Result<ResponseInitChain, AppError> {
        self.app.lock().init_chain(request)
    }

    pub fn check_tx(&self, tx: &[u8]) -> ResponseCheckTx {
        self.app.lock().check_tx(tx)
    }

    pub fn begin_block(&self, request: RequestBeginBlock) -> Result<(), AppError> {
        self.app.lock().begin_block(request)
    }

    pub fn deliver_tx(&self, tx: &[u8]) -> ResponseDeliverTx {
        self.app.lock().deliver_tx(tx)
    }

    pub fn end_block(&self, height: Height) -> ResponseEndBlock {
        self.app.lock().end_block(height)
    }

    pub fn commit(&self) -> Result<ResponseCommit, AppError> {
        self.app.lock().commit()
    }

    pub fn query(&self, request: RequestQuery) -> ResponseQuery {
        self.app.lock().query(request)
    }
}
