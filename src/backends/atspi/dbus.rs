//! [`AccessibilityTree`] over the AT-SPI D-Bus protocol.
//!
//! The accessibility bus is a private bus whose address is handed out by
//! `org.a11y.Bus` on the session bus.  Every accessible is addressed by a
//! `(bus name, object path)` pair; the registry owns the desktop root.
//! The typed proxies come from `atspi`, used in their blocking form.

use super::{AccessibilityTree, AccessibleNode, CoordType, Role, StateSet, Toolkit};
use crate::backends::BackendError;
use crate::types::Extents;
use ::atspi::proxy::accessible::AccessibleProxyBlocking;
use ::atspi::proxy::application::ApplicationProxyBlocking;
use ::atspi::proxy::bus::BusProxyBlocking;
use ::atspi::proxy::component::ComponentProxyBlocking;
use ::atspi::ObjectRef;
use log::debug;
use zbus::blocking::fdo::DBusProxy;
use zbus::blocking::{Connection, ConnectionBuilder};
use zbus::names::BusName;
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedObjectPath;

const REGISTRY: &str = "org.a11y.atspi.Registry";
const ROOT_PATH: &str = "/org/a11y/atspi/accessible/root";

/// Connects to the accessibility bus on first use.
#[derive(Debug, Default)]
pub struct DbusTree;

impl DbusTree {
    pub fn new() -> Self {
        Self
    }

    fn connect() -> Result<Connection, BackendError> {
        let session = Connection::session()?;
        let address = BusProxyBlocking::new(&session)?.get_address()?;
        debug!("accessibility bus at {}", address);
        Ok(ConnectionBuilder::address(address.as_str())?.build()?)
    }
}

impl AccessibilityTree for DbusTree {
    type Node = DbusNode;

    fn desktop(&self) -> Result<DbusNode, BackendError> {
        let conn = Self::connect()?;
        let path = OwnedObjectPath::try_from(ROOT_PATH).map_err(zbus::Error::from)?;
        Ok(DbusNode {
            conn,
            destination: REGISTRY.to_string(),
            path,
        })
    }
}

/// A remote accessible object.
#[derive(Debug, Clone)]
pub struct DbusNode {
    conn: Connection,
    destination: String,
    path: OwnedObjectPath,
}

impl DbusNode {
    fn accessible(&self) -> Result<AccessibleProxyBlocking<'_>, BackendError> {
        Ok(AccessibleProxyBlocking::builder(&self.conn)
            .destination(self.destination.as_str())?
            .path(self.path.as_str())?
            .cache_properties(CacheProperties::No)
            .build()?)
    }

    fn component(&self) -> Result<ComponentProxyBlocking<'_>, BackendError> {
        Ok(ComponentProxyBlocking::builder(&self.conn)
            .destination(self.destination.as_str())?
            .path(self.path.as_str())?
            .cache_properties(CacheProperties::No)
            .build()?)
    }

    fn at(&self, object: ObjectRef) -> DbusNode {
        DbusNode {
            conn: self.conn.clone(),
            destination: object.name.to_string(),
            path: object.path,
        }
    }
}

impl AccessibleNode for DbusNode {
    fn description(&self) -> Result<String, BackendError> {
        Ok(self.accessible()?.description()?)
    }

    fn role(&self) -> Result<Role, BackendError> {
        Ok(self.accessible()?.get_role()?)
    }

    fn states(&self) -> Result<StateSet, BackendError> {
        Ok(self.accessible()?.get_state()?)
    }

    fn extents(&self, coords: CoordType) -> Result<Extents, BackendError> {
        let (x, y, width, height) = self.component()?.get_extents(coords)?;
        Ok(Extents::new(x, y, width, height))
    }

    fn children(&self) -> Result<Vec<Self>, BackendError> {
        Ok(self
            .accessible()?
            .get_children()?
            .into_iter()
            .map(|child| self.at(child))
            .collect())
    }

    fn process_id(&self) -> Result<u32, BackendError> {
        let name = BusName::try_from(self.destination.as_str()).map_err(zbus::Error::from)?;
        Ok(DBusProxy::new(&self.conn)?.get_connection_unix_process_id(name).map_err(zbus::Error::from)?)
    }

    fn toolkit(&self) -> Result<Toolkit, BackendError> {
        let app = self.at(self.accessible()?.get_application()?);
        let proxy = ApplicationProxyBlocking::builder(&app.conn)
            .destination(app.destination.as_str())?
            .path(app.path.as_str())?
            .cache_properties(CacheProperties::No)
            .build()?;
        Ok(Toolkit {
            name: proxy.toolkit_name()?,
            version: proxy.version()?,
        })
    }
}
