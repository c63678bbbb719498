use strum::FromRepr;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
pub enum MsgId {
    // Session
    Hello = 0x01,
    ConnectionSuccessful = 0x02,
    ConnectionRejected = 0x03,
    PlayerJoin = 0x10,
    PlayerLeave = 0x11,
    ChatMessage = 0x30,

    // Chunked transfers
    ChunkedDataStart = 0x40,
    ChunkedDataEnd = 0x41,
    ChunkedDataPayload = 0x42,
    ChunkedDataProgress = 0x43,
    ChunkedDataComplete = 0x44,
    ChunkedDataAbort = 0x45,

    // Input
    PadData = 0x60,
    PadMapping = 0x61,
    PadBuffer = 0x62,
    PadHostData = 0x63,
    GbaConfig = 0x64,
    WiimoteData = 0x70,
    WiimoteMapping = 0x71,
    RequestPadMappingChange = 0x72,
    RequestBufferChange = 0x73,

    // Host input authority ("golf")
    GolfRequest = 0x90,
    GolfSwitch = 0x91,
    GolfAcquire = 0x92,
    GolfRelease = 0x93,
    GolfPrepare = 0x94,

    // Game lifecycle
    ChangeGame = 0xA1,
    GameStatus = 0xA2,
    ClientCapabilities = 0xA3,
    StartGame = 0xA4,
    HostInputAuthority = 0xA5,
    PowerButton = 0xA6,
    StartGameAck = 0xA7,
    StopGame = 0xA9,
    DisableGame = 0xAA,
    TimeBase = 0xAB,
    DesyncDetected = 0xAC,
    ComputeGameDigest = 0xAD,
    GameDigestProgress = 0xAE,
    GameDigestResult = 0xAF,
    GameDigestAbort = 0xB0,
    GameDigestError = 0xB1,
    RequestChangeGame = 0xB2,
    RequestChangeGameFull = 0xB3,
    ChangeGameNotFound = 0xB4,
    RequestStartGame = 0xB5,
    ClientInitialStateAck = 0xB6,
    PauseSimulation = 0xB7,
    ResumeSimulation = 0xB8,

    // Liveness
    Ping = 0xE0,
    Pong = 0xE1,
    PlayerPingData = 0xE2,

    // Synchronization sub-protocols
    SyncSaveData = 0xF0,
    SyncCodes = 0xF1,
}
