/// 标准化输入事件, 帧组装和输出的指针动作
pub mod event_model;

/// 设备身份和触摸板能力, 由探测层提供
pub mod device;

/// 按设备身份匹配的 quirks 数据库
pub mod quirks;

/// 触摸板手势状态机
pub mod gesture;

/// 按住中键拖动产生滚轮事件
pub mod scroll;

/// 左右键同时按下模拟中键
pub mod emulation;

/// 静止设备的漂移过滤
pub mod drift;

/// 连击计数
pub mod click;

/// 滚轮映射为按键
pub mod wheel;

/// 守护进程配置文件
pub mod config;

/// 每个设备的处理链和事件循环
pub mod pipeline;

/// 录制文件回放
pub mod replay;

// 解码层 (evdev / 传统字节协议) 和注入层 (显示系统) 不在这个 crate 里
// 这里只负责: 事件进来, 经过每个设备独立的一串状态机, 指针动作出去
// 所有状态机都挂在单线程事件循环上, 设备之间不共享状态, 所以没有锁
