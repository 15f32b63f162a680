#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineRecord {
    pub name: String,
    pub address: String,
}

impl MachineRecord {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// A machine whose address was looked up for the current invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTarget {
    pub machine_name: String,
    pub address: String,
}

impl From<MachineRecord> for RemoteTarget {
    fn from(record: MachineRecord) -> Self {
        Self {
            machine_name: record.name,
            address: record.address,
        }
    }
}
