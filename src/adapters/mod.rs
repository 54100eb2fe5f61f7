// 外部系統的實作：REST 後端與本機檔案存儲

pub mod http;
pub mod storage;
