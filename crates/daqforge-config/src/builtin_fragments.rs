//! Built-in configuration fragments.
//!
//! One template per (flavor, transport, role) key, embedded at compile time
//! so a fragment library is always available without external files. Each
//! template is a single-context document; the synthesizer deep-copies it and
//! patches instance numbers, endpoint tokens and resource parameters.
//!
//! Controller templates are transport-independent (the front-end link is
//! always TCP), so one template serves every key with the `ferol` role.

/// (key, template) pairs for every built-in fragment.
pub(crate) static BUILTIN_FRAGMENTS: &[(&str, &str)] = &[
    ("evb_ibv_evm", EVB_IBV_EVM),
    ("evb_ibv_ru", EVB_IBV_RU),
    ("evb_ibv_bu", EVB_IBV_BU),
    ("evb_ibv_ferol", FEROL),
    ("evb_utcp_evm", EVB_UTCP_EVM),
    ("evb_utcp_ru", EVB_UTCP_RU),
    ("evb_utcp_bu", EVB_UTCP_BU),
    ("evb_utcp_ferol", FEROL),
    ("gevb_ibv_evm", GEVB_IBV_EVM),
    ("gevb_ibv_ru", GEVB_IBV_RU),
    ("gevb_ibv_bu", GEVB_IBV_BU),
    ("gevb_ibv_ferol", FEROL),
    ("gevb_utcp_evm", GEVB_UTCP_EVM),
    ("gevb_utcp_ru", GEVB_UTCP_RU),
    ("gevb_utcp_bu", GEVB_UTCP_BU),
    ("gevb_utcp_ferol", FEROL),
];

const EVB_IBV_EVM: &str = r#"
title = "event manager (folded)"

[[contexts]]
role = "EVM"
instance = 0
url = "http://EVM%INSTANCE%_CONTROL_HOST_NAME:EVM%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "evb::EVM"
instance = 0
[contexts.applications.properties]
MAX_FRAGMENT_BYTES = 65536
EVENTS_IN_FLIGHT = 256
FED_SOURCE_IDS = []
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::ibv::Application"
instance = 0
[contexts.applications.properties]
DEVICE_NAME = "mlx5_0"
DEVICE_PORT = 1
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const EVB_IBV_RU: &str = r#"
title = "readout unit"

[[contexts]]
role = "RU"
instance = 0
url = "http://RU%INSTANCE%_CONTROL_HOST_NAME:RU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "evb::RU"
instance = 0
[contexts.applications.properties]
INPUT_SOURCE = "socket"
MAX_FRAGMENT_BYTES = 65536
FED_SOURCE_IDS = []
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::ibv::Application"
instance = 0
[contexts.applications.properties]
DEVICE_NAME = "mlx5_0"
DEVICE_PORT = 1
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const EVB_IBV_BU: &str = r#"
title = "builder unit"

[[contexts]]
role = "BU"
instance = 0
url = "http://BU%INSTANCE%_CONTROL_HOST_NAME:BU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "evb::BU"
instance = 0
[contexts.applications.properties]
DROP_AT_SOCKET = false
EVENTS_PER_REQUEST = 8
MAX_EVENTS_UNDER_CONSTRUCTION = 64
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::ibv::Application"
instance = 0
[contexts.applications.properties]
DEVICE_NAME = "mlx5_0"
DEVICE_PORT = 1
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const EVB_UTCP_EVM: &str = r#"
title = "event manager (folded)"

[[contexts]]
role = "EVM"
instance = 0
url = "http://EVM%INSTANCE%_CONTROL_HOST_NAME:EVM%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "evb::EVM"
instance = 0
[contexts.applications.properties]
MAX_FRAGMENT_BYTES = 65536
EVENTS_IN_FLIGHT = 256
FED_SOURCE_IDS = []
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::utcp::Application"
instance = 0
[contexts.applications.properties]
TCP_NODELAY = true
IO_THREADS = 4
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const EVB_UTCP_RU: &str = r#"
title = "readout unit"

[[contexts]]
role = "RU"
instance = 0
url = "http://RU%INSTANCE%_CONTROL_HOST_NAME:RU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "evb::RU"
instance = 0
[contexts.applications.properties]
INPUT_SOURCE = "socket"
MAX_FRAGMENT_BYTES = 65536
FED_SOURCE_IDS = []
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::utcp::Application"
instance = 0
[contexts.applications.properties]
TCP_NODELAY = true
IO_THREADS = 4
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const EVB_UTCP_BU: &str = r#"
title = "builder unit"

[[contexts]]
role = "BU"
instance = 0
url = "http://BU%INSTANCE%_CONTROL_HOST_NAME:BU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "evb::BU"
instance = 0
[contexts.applications.properties]
DROP_AT_SOCKET = false
EVENTS_PER_REQUEST = 8
MAX_EVENTS_UNDER_CONSTRUCTION = 64
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::utcp::Application"
instance = 0
[contexts.applications.properties]
TCP_NODELAY = true
IO_THREADS = 4
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const GEVB_IBV_EVM: &str = r#"
title = "event manager (standalone)"

[[contexts]]
role = "EVM"
instance = 0
url = "http://EVM%INSTANCE%_CONTROL_HOST_NAME:EVM%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "gevb::EVM"
instance = 0
[contexts.applications.properties]
MAX_FRAGMENT_BYTES = 65536
EVENTS_IN_FLIGHT = 256
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::ibv::Application"
instance = 0
[contexts.applications.properties]
DEVICE_NAME = "mlx5_0"
DEVICE_PORT = 1
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const GEVB_IBV_RU: &str = r#"
title = "readout unit"

[[contexts]]
role = "RU"
instance = 0
url = "http://RU%INSTANCE%_CONTROL_HOST_NAME:RU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "gevb::RU"
instance = 0
[contexts.applications.properties]
INPUT_SOURCE = "socket"
MAX_FRAGMENT_BYTES = 65536
FED_SOURCE_IDS = []
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::ibv::Application"
instance = 0
[contexts.applications.properties]
DEVICE_NAME = "mlx5_0"
DEVICE_PORT = 1
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const GEVB_IBV_BU: &str = r#"
title = "builder unit"

[[contexts]]
role = "BU"
instance = 0
url = "http://BU%INSTANCE%_CONTROL_HOST_NAME:BU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "gevb::BU"
instance = 0
[contexts.applications.properties]
DROP_AT_SOCKET = false
EVENTS_PER_REQUEST = 8
MAX_EVENTS_UNDER_CONSTRUCTION = 64
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::ibv::Application"
instance = 0
[contexts.applications.properties]
DEVICE_NAME = "mlx5_0"
DEVICE_PORT = 1
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const GEVB_UTCP_EVM: &str = r#"
title = "event manager (standalone)"

[[contexts]]
role = "EVM"
instance = 0
url = "http://EVM%INSTANCE%_CONTROL_HOST_NAME:EVM%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "gevb::EVM"
instance = 0
[contexts.applications.properties]
MAX_FRAGMENT_BYTES = 65536
EVENTS_IN_FLIGHT = 256
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::utcp::Application"
instance = 0
[contexts.applications.properties]
TCP_NODELAY = true
IO_THREADS = 4
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const GEVB_UTCP_RU: &str = r#"
title = "readout unit"

[[contexts]]
role = "RU"
instance = 0
url = "http://RU%INSTANCE%_CONTROL_HOST_NAME:RU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "gevb::RU"
instance = 0
[contexts.applications.properties]
INPUT_SOURCE = "socket"
MAX_FRAGMENT_BYTES = 65536
FED_SOURCE_IDS = []
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::utcp::Application"
instance = 0
[contexts.applications.properties]
TCP_NODELAY = true
IO_THREADS = 4
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

const GEVB_UTCP_BU: &str = r#"
title = "builder unit"

[[contexts]]
role = "BU"
instance = 0
url = "http://BU%INSTANCE%_CONTROL_HOST_NAME:BU%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "gevb::BU"
instance = 0
[contexts.applications.properties]
DROP_AT_SOCKET = false
EVENTS_PER_REQUEST = 8
MAX_EVENTS_UNDER_CONSTRUCTION = 64
PEER_ENDPOINTS = []

[[contexts.applications]]
class = "pt::utcp::Application"
instance = 0
[contexts.applications.properties]
TCP_NODELAY = true
IO_THREADS = 4
SEND_POOL_BYTES = 0
RECV_POOL_BYTES = 0
COMPLETION_QUEUE_DEPTH = 0
SEND_QUEUE_DEPTH = 0
RECV_QUEUE_DEPTH = 0
"#;

/// Front-end controller template, shared across flavors and transports.
const FEROL: &str = r#"
title = "front-end controller"

[[contexts]]
role = "FEROL"
instance = 0
url = "http://FEROL%INSTANCE%_CONTROL_HOST_NAME:FEROL%INSTANCE%_CONTROL_PORT"

[[contexts.applications]]
class = "ferol::Controller"
instance = 0
[contexts.applications.properties]
OPERATION_MODE = "SINGLE_LINK"
TRIGGER_MODE = "INTERNAL_GENERATOR"
FED_ID_0 = -1
FED_ID_1 = -1
EFED_SLICE_0 = -1
EFED_SLOT_0 = -1
EFED_SLICE_1 = -1
EFED_SLOT_1 = -1
TCP_CWND_FED0 = 80000
TCP_CWND_FED1 = 80000
DESTINATION_HOST = "RU0_DATA_HOST_NAME"
DESTINATION_PORT = "RU0_FEDLINK_PORT"
"#;
