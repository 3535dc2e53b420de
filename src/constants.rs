/// Built-in OUI fallback table in Wireshark `manuf` format, used when no
/// `manuf.txt` sits beside the binary. Deliberately tiny: enough to classify
/// the vendors the device-type heuristics care about plus the usual
/// virtualisation suspects.
pub const BUILTIN_OUI: &str = "\
00:17:F2\tApple\tApple, Inc.
00:1C:B3\tApple\tApple, Inc.
00:26:BB\tApple\tApple, Inc.
A4:5E:60\tApple\tApple, Inc.
F0:18:98\tApple\tApple, Inc.
00:1A:11\tGoogle\tGoogle, Inc.
3C:5A:B4\tGoogle\tGoogle, Inc.
D8:27:27\tSamsungE\tSamsung Electronics Co.,Ltd
B8:27:EB\tRaspberr\tRaspberry Pi Foundation
DC:A6:32\tRaspberr\tRaspberry Pi Trading Ltd
00:0C:29\tVMware\tVMware, Inc.
00:50:56\tVMware\tVMware, Inc.
08:00:27\tPCSSyste\tPCS Systemtechnik GmbH
00:15:5D\tMicrosof\tMicrosoft Corporation
00:0D:3A\tMicrosof\tMicrosoft Corporation
00:00:0C\tCisco\tCisco Systems, Inc
00:01:42\tCisco\tCisco Systems, Inc
3C:84:6A\tTp-LinkT\tTP-Link Technologies Co.,Ltd
00:09:5B\tNetgear\tNetgear
00:04:20\tIntel\tIntel Corporation
00:E0:4C\tRealtek\tRealtek Semiconductor Corp.
";
